//! Import-path resolution for Go-producing targets.
//!
//! rules_go has declared import paths in several ways over time, and a
//! single workspace may mix them. Each convention is one
//! [`ImportPathStrategy`]; [`ImportPathResolver`] tries them in order and
//! stops at the first hit.

use std::fmt;

use bazel_gopath_schemas::{Label, Rule};
use tracing::debug;

use crate::error::ProjectError;
use crate::index::BuildIndex;

/// Name of the `_go_prefix_rule` target that rules implicitly depend on.
pub const GO_PREFIX_NAME: &str = "go_prefix";

/// A resolved import path and the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath {
    pub path: String,
    pub strategy: &'static str,
}

/// One way of finding a target's import path.
pub trait ImportPathStrategy: fmt::Debug {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Returns the import path, or `None` if this convention does not apply
    /// to `rule`.
    ///
    /// # Errors
    ///
    /// Fails only on malformed labels in the graph.
    fn resolve(
        &self,
        rule: &Rule,
        label: &Label,
        index: &BuildIndex,
    ) -> Result<Option<String>, ProjectError>;
}

/// Uses the rule's own `importpath` attribute verbatim.
#[derive(Debug)]
pub struct ImportPathAttr;

impl ImportPathStrategy for ImportPathAttr {
    fn name(&self) -> &'static str {
        "importpath"
    }

    fn resolve(
        &self,
        rule: &Rule,
        _label: &Label,
        _index: &BuildIndex,
    ) -> Result<Option<String>, ProjectError> {
        Ok(rule
            .attr_str("importpath")
            .filter(|path| !path.is_empty())
            .map(str::to_owned))
    }
}

/// Follows the implicit `:go_prefix` rule input to its declared prefix.
///
/// Once `go_prefix` became a private attribute it stopped showing up in
/// query attributes, but the dependency edge to the prefix rule remains.
#[derive(Debug)]
pub struct PrefixInput;

impl ImportPathStrategy for PrefixInput {
    fn name(&self) -> &'static str {
        "prefix_input"
    }

    fn resolve(
        &self,
        rule: &Rule,
        _label: &Label,
        index: &BuildIndex,
    ) -> Result<Option<String>, ProjectError> {
        for input in &rule.inputs {
            if Label::parse(input)?.name() == GO_PREFIX_NAME {
                return Ok(index
                    .prefix(input)
                    .filter(|prefix| !prefix.is_empty())
                    .map(str::to_owned));
            }
        }
        Ok(None)
    }
}

/// Resolves the `go_prefix` attribute relative to the rule's workspace.
#[derive(Debug)]
pub struct GoPrefixAttr;

impl ImportPathStrategy for GoPrefixAttr {
    fn name(&self) -> &'static str {
        "go_prefix_attr"
    }

    fn resolve(
        &self,
        rule: &Rule,
        label: &Label,
        index: &BuildIndex,
    ) -> Result<Option<String>, ProjectError> {
        let Some(value) = rule.attr_str(GO_PREFIX_NAME) else {
            return Ok(None);
        };
        // A repository-relative `//:go_prefix` belongs to the rule's own
        // workspace.
        let prefix_label = if value.starts_with("//") {
            format!("{}{value}", label.workspace())
        } else {
            value.to_owned()
        };
        Ok(index
            .prefix(&prefix_label)
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_owned))
    }
}

/// Tries each strategy in order.
#[derive(Debug)]
pub struct ImportPathResolver {
    strategies: Vec<Box<dyn ImportPathStrategy>>,
}

impl Default for ImportPathResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ImportPathAttr),
            Box::new(PrefixInput),
            Box::new(GoPrefixAttr),
        ])
    }
}

impl ImportPathResolver {
    pub fn new(strategies: Vec<Box<dyn ImportPathStrategy>>) -> Self {
        Self { strategies }
    }

    /// Returns the first import path any strategy finds, or `None` if the
    /// target has no resolvable import path.
    pub fn resolve(
        &self,
        rule: &Rule,
        label: &Label,
        index: &BuildIndex,
    ) -> Result<Option<ImportPath>, ProjectError> {
        for strategy in &self.strategies {
            if let Some(path) = strategy.resolve(rule, label, index)? {
                debug!(
                    rule = %rule.name,
                    strategy = strategy.name(),
                    %path,
                    "import path resolved"
                );
                return Ok(Some(ImportPath {
                    path,
                    strategy: strategy.name(),
                }));
            }
        }
        Ok(None)
    }
}
