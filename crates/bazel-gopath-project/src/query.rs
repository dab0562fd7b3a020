//! Runs `bazel query` and captures its proto output.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{info, warn};

use crate::error::ProjectError;

/// Every Go and proto rule in the workspace plus everything they depend on,
/// which pulls in prefix declarations, proto compilers and genrules.
pub const GO_TARGETS_QUERY: &str =
    "deps(kind('_?go_.*|proto_compile|proto_library rule', //...))";

/// A `bazel query` invocation against one workspace.
#[derive(Debug, Clone)]
pub struct QueryCommand {
    bazel: PathBuf,
    workspace: PathBuf,
    expression: String,
}

impl QueryCommand {
    pub fn new(
        bazel: impl Into<PathBuf>,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bazel: bazel.into(),
            workspace: workspace.into(),
            expression: GO_TARGETS_QUERY.to_owned(),
        }
    }

    /// The arguments passed to the Bazel binary.
    pub fn args(&self) -> [&str; 4] {
        ["query", "--output=proto", "-k", &self.expression]
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Runs the query to completion and returns its stdout.
    ///
    /// Stderr goes straight to ours. With `-k`, Bazel exits non-zero when
    /// part of the graph fails to load but still prints the rest, so a
    /// failing exit status is only logged.
    ///
    /// # Errors
    ///
    /// Fails if the process cannot be started or waited on.
    pub fn run(&self) -> Result<Vec<u8>, ProjectError> {
        info!(
            bazel = %self.bazel.display(),
            workspace = %self.workspace.display(),
            query = %self.expression,
            "query.running"
        );
        let output = Command::new(&self.bazel)
            .args(self.args())
            .current_dir(&self.workspace)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| ProjectError::query_spawn(self.bazel.clone(), e))?;

        if !output.status.success() {
            warn!(
                status = %output.status,
                "query exited unsuccessfully, using partial output"
            );
        }
        info!(bytes = output.stdout.len(), "query.complete");
        Ok(output.stdout)
    }
}
