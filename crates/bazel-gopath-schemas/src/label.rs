//! Bazel target labels.
//!
//! A label has the form `workspace//package:name`. The workspace part is
//! empty for targets in the main workspace and `@repo` (or `@@repo` under
//! bzlmod) for external repositories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A parsed `workspace//package:name` label.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Label {
    workspace: String,
    package: String,
    name: String,
}

impl Label {
    /// Parses a label string.
    ///
    /// Splits on the first `//` to isolate the workspace, then splits the
    /// remainder on the first `:` to isolate package and name. Both
    /// separators are required.
    ///
    /// # Errors
    ///
    /// Returns [`ParseLabelError`] if either separator is missing.
    pub fn parse(input: &str) -> Result<Self, ParseLabelError> {
        let (workspace, rest) = input
            .split_once("//")
            .ok_or_else(|| ParseLabelError::new(input, "//"))?;
        let (package, name) = rest
            .split_once(':')
            .ok_or_else(|| ParseLabelError::new(input, ":"))?;

        Ok(Self {
            workspace: workspace.to_owned(),
            package: package.to_owned(),
            name: name.to_owned(),
        })
    }

    /// The workspace part, including its leading `@` markers. Empty for the
    /// main workspace.
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// The slash-separated package path.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The target name within its package. For file targets this is the
    /// file path relative to the package.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this label lives in the main workspace.
    pub fn is_main_workspace(&self) -> bool {
        self.workspace.is_empty()
    }

    /// A label in the same workspace and package with a different name.
    #[must_use]
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self {
            workspace: self.workspace.clone(),
            package: self.package.clone(),
            name: name.into(),
        }
    }

    /// The external repository name with leading `@` markers stripped, or
    /// `None` for the main workspace.
    pub fn repository(&self) -> Option<&str> {
        if self.is_main_workspace() {
            None
        } else {
            Some(self.workspace.trim_start_matches('@'))
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}//{}:{}", self.workspace, self.package, self.name)
    }
}

impl FromStr for Label {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A label string that is missing a required separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLabelError {
    input: String,
    missing: &'static str,
}

impl ParseLabelError {
    fn new(input: &str, missing: &'static str) -> Self {
        Self {
            input: input.to_owned(),
            missing,
        }
    }

    /// The string that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for ParseLabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed label {:?}: missing `{}` separator",
            self.input, self.missing
        )
    }
}

impl std::error::Error for ParseLabelError {}
