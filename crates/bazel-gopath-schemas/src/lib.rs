//! Build graph types shared across bazel-gopath.
//!
//! This crate holds the data the projection engine reads:
//!
//! - [`Label`]: a parsed `workspace//package:name` identifier
//! - [`BuildGraph`]: the queried targets and their rules, with rule classes
//!   narrowed to the closed [`RuleClass`] set
//! - [`wire`]: the `bazel query --output=proto` format and its conversion
//!   into [`BuildGraph`]

mod graph;
mod label;
#[cfg(test)]
mod testutil;
pub mod wire;

#[doc(inline)]
pub use graph::*;
#[doc(inline)]
pub use label::*;
#[doc(inline)]
pub use wire::decode_query_result;
