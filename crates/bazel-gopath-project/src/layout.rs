//! Where things live on disk: the Bazel workspace and the GOPATH tree.
//!
//! Path formats:
//! - Literal sources: `<workspace>/<package>/<name>`, or for external
//!   repositories
//!   `<workspace>/bazel-<basename>/external/<repo>/<package>/<name>`
//! - Generated sources: `<workspace>/bazel-genfiles/<package>/<name>`
//! - Destinations: `<gopath>/src/<import path>/<file>`

use std::path::PathBuf;

use bazel_gopath_schemas::Label;
use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ProjectError;

/// Name of the default GOPATH directory inside the workspace.
pub const DEFAULT_GOPATH_DIR: &str = ".gopath";

/// Directory under the workspace holding generated files.
const GENFILES_DIR: &str = "bazel-genfiles";

/// Filesystem roots for one projection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    workspace: Utf8PathBuf,
    gopath: Utf8PathBuf,
}

impl Layout {
    /// Creates a layout. `gopath` defaults to `<workspace>/.gopath`.
    pub fn new(
        workspace: impl Into<Utf8PathBuf>,
        gopath: Option<Utf8PathBuf>,
    ) -> Self {
        let workspace = workspace.into();
        let gopath =
            gopath.unwrap_or_else(|| workspace.join(DEFAULT_GOPATH_DIR));
        Self { workspace, gopath }
    }

    /// Like [`Layout::new`], for paths coming from the command line.
    ///
    /// # Errors
    ///
    /// Fails if either path is not valid UTF-8.
    pub fn from_std(
        workspace: PathBuf,
        gopath: Option<PathBuf>,
    ) -> Result<Self, ProjectError> {
        let workspace = utf8(workspace)?;
        let gopath = gopath.map(utf8).transpose()?;
        Ok(Self::new(workspace, gopath))
    }

    pub fn workspace(&self) -> &Utf8Path {
        &self.workspace
    }

    pub fn gopath(&self) -> &Utf8Path {
        &self.gopath
    }

    /// The `src` directory of the GOPATH. Nothing is created above it.
    pub fn src_root(&self) -> Utf8PathBuf {
        self.gopath.join("src")
    }

    /// Destination of a file placed in package `package_path`.
    pub fn destination(&self, package_path: &Utf8Path) -> Utf8PathBuf {
        self.src_root().join(package_path)
    }

    /// Checked-in location of a source file label.
    pub fn literal_source(&self, label: &Label) -> Utf8PathBuf {
        self.workspace_root(label)
            .join(label.package())
            .join(label.name())
    }

    /// Location of a generated file label.
    pub fn generated_source(&self, label: &Label) -> Utf8PathBuf {
        self.workspace
            .join(GENFILES_DIR)
            .join(label.package())
            .join(label.name())
    }

    fn workspace_root(&self, label: &Label) -> Utf8PathBuf {
        match label.repository() {
            None => self.workspace.clone(),
            Some(repo) => {
                let base = self.workspace.file_name().unwrap_or_default();
                self.workspace
                    .join(format!("bazel-{base}"))
                    .join("external")
                    .join(repo)
            }
        }
    }
}

fn utf8(path: PathBuf) -> Result<Utf8PathBuf, ProjectError> {
    Utf8PathBuf::from_path_buf(path).map_err(ProjectError::non_utf8_path)
}
