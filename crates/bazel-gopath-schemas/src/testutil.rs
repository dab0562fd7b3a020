//! Shared proptest strategies for schema tests.

use proptest::prelude::*;

/// Strategy for workspace prefixes: empty (main workspace) or `@repo`.
pub fn arb_workspace() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "@{1,2}[a-z_][a-z0-9_]{0,15}"]
}

/// Strategy for slash-separated package paths, including the root package.
pub fn arb_package() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z_][a-z0-9_]{0,9}", 0..4)
        .prop_map(|segments| segments.join("/"))
}

/// Strategy for target or file names.
pub fn arb_name() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_.]{0,19}"
}
