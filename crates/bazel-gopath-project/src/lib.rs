//! Projection of a Bazel build graph into a GOPATH of symlinks.
//!
//! Tools that only understand `GOPATH` layouts (editors, language servers,
//! plain `go build`) cannot see Bazel-managed Go code. This crate queries the
//! build graph and recreates the conventional `src/<import path>/` tree with
//! symlinks into the workspace and its generated outputs.
//!
//! ## Pipeline
//!
//! 1. Run `bazel query --output=proto` ([`QueryCommand`])
//! 2. Decode the result into a [`BuildGraph`]
//! 3. Build the lookup tables in one pass ([`BuildIndex`])
//! 4. Resolve, plan and link every Go target ([`Projector`])
//!
//! ## Usage
//!
//! ```no_run
//! use bazel_gopath_project::{Config, run};
//!
//! let config = Config::new("bazel", "/path/to/workspace", None).unwrap();
//! let report = run(&config).unwrap();
//! println!("{} links created", report.links_created);
//! ```

mod error;
mod index;
mod layout;
mod project;
mod query;
mod resolve;
mod sources;

use std::path::PathBuf;

// Re-export schema types for convenience.
#[doc(inline)]
pub use bazel_gopath_schemas::{BuildGraph, Label, Rule, RuleClass};
use tracing::instrument;

#[doc(inline)]
pub use crate::error::ProjectError;
pub use crate::index::BuildIndex;
pub use crate::layout::{DEFAULT_GOPATH_DIR, Layout};
pub use crate::project::{
    DEFAULT_LIBRARY_NAME, Link, LinkKind, ProjectionReport, Projector,
    SkipReason, SkippedTarget, TargetOutcome, TargetPlan,
};
pub use crate::query::{GO_TARGETS_QUERY, QueryCommand};
pub use crate::resolve::{
    GoPrefixAttr, ImportPath, ImportPathAttr, ImportPathResolver,
    ImportPathStrategy, PrefixInput,
};
pub use crate::sources::{SourceArtifact, classify_source};

/// Everything a run needs: where Bazel is, and where the trees live.
#[derive(Debug, Clone)]
pub struct Config {
    pub bazel: PathBuf,
    pub layout: Layout,
}

impl Config {
    /// Builds a config from command-line paths. `gopath` defaults to
    /// `<workspace>/.gopath`.
    ///
    /// # Errors
    ///
    /// Fails if the workspace or GOPATH path is not valid UTF-8.
    pub fn new(
        bazel: impl Into<PathBuf>,
        workspace: impl Into<PathBuf>,
        gopath: Option<PathBuf>,
    ) -> Result<Self, ProjectError> {
        Ok(Self {
            bazel: bazel.into(),
            layout: Layout::from_std(workspace.into(), gopath)?,
        })
    }
}

/// Decodes raw `bazel query --output=proto` bytes.
///
/// # Errors
///
/// Returns [`ProjectError`] ([`ProjectError::is_decode`]) if the bytes are
/// not a valid query result.
pub fn decode_graph(bytes: &[u8]) -> Result<BuildGraph, ProjectError> {
    Ok(bazel_gopath_schemas::decode_query_result(bytes)?)
}

/// Builds the index for `graph` and projects it into `layout`.
///
/// # Errors
///
/// See [`Projector::project`].
pub fn project_graph(
    graph: &BuildGraph,
    layout: &Layout,
) -> Result<ProjectionReport, ProjectError> {
    let index = BuildIndex::build(graph);
    Projector::new(layout, &index).project(graph)
}

/// Run the full pipeline: query, decode, index and project.
///
/// # Errors
///
/// Returns [`ProjectError`] if:
/// - Bazel cannot be started ([`ProjectError::is_query`])
/// - The query output cannot be decoded ([`ProjectError::is_decode`])
/// - The graph contains malformed input ([`ProjectError::is_malformed_input`])
/// - Creating directories or links fails ([`ProjectError::is_io`])
#[instrument(skip_all, fields(workspace = %config.layout.workspace()))]
pub fn run(config: &Config) -> Result<ProjectionReport, ProjectError> {
    // Step 1: query the build graph.
    let query = QueryCommand::new(&config.bazel, config.layout.workspace());
    let bytes = query.run()?;

    // Step 2: decode.
    let graph = decode_graph(&bytes)?;

    // Step 3: index everything, then project.
    project_graph(&graph, &config.layout)
}
