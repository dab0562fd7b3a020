//! Build graph model consumed by the projection engine.
//!
//! This is a narrowed, typed view of a `bazel query` result: every target
//! keeps its label, and rule targets keep the handful of fields the
//! projection needs (class, inputs, outputs, string-valued attributes).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The full set of targets returned by a query, in query order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildGraph {
    pub targets: Vec<Target>,
}

impl BuildGraph {
    /// Iterates over the rule targets, skipping source and generated files.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.targets.iter().filter_map(|t| t.rule.as_ref())
    }
}

/// A node of the build graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
}

/// A buildable unit: one instantiated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// The rule's label, e.g. `//foo:go_default_library`.
    pub name: String,
    pub class: RuleClass,
    /// Declared output labels, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    /// Labels this rule depends on directly, in query order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, AttrValue>,
}

impl Rule {
    /// Returns the attribute with the given name, if present.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// Returns a single-string attribute. List attributes yield `None`.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(AttrValue::as_str)
    }

    /// Returns a list attribute as a slice. Single-string attributes and
    /// missing attributes yield an empty slice.
    pub fn attr_list(&self, name: &str) -> &[String] {
        self.attr(name).map(AttrValue::as_list).unwrap_or_default()
    }
}

/// An attribute value: either one string or an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    List(Vec<String>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            AttrValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            AttrValue::Str(_) => &[],
            AttrValue::List(values) => values,
        }
    }
}

/// The rule classes the projection understands.
///
/// Anything else is carried as [`RuleClass::Other`] and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleClass {
    /// `genrule`: may declare generated `.go` outputs.
    Genrule,
    /// `_go_prefix_rule`: declares an import-path prefix.
    GoPrefix,
    /// `proto_compile`: generates bindings from its `protos`.
    ProtoCompile,
    /// `proto_library`: groups `.proto` sources.
    ProtoLibrary,
    /// `go_proto_compiler`: declares a generated filename suffix.
    GoProtoCompiler,
    GoLibrary,
    GoProtoLibrary,
    GoBinary,
    Other(String),
}

impl RuleClass {
    /// Maps a Bazel rule class name onto the closed set of known classes.
    pub fn from_class_name(name: &str) -> Self {
        match name {
            "genrule" => RuleClass::Genrule,
            "_go_prefix_rule" => RuleClass::GoPrefix,
            "proto_compile" => RuleClass::ProtoCompile,
            "proto_library" => RuleClass::ProtoLibrary,
            "go_proto_compiler" => RuleClass::GoProtoCompiler,
            "go_library" => RuleClass::GoLibrary,
            "go_proto_library" => RuleClass::GoProtoLibrary,
            "go_binary" => RuleClass::GoBinary,
            other => RuleClass::Other(other.to_owned()),
        }
    }

    /// The Bazel rule class name.
    pub fn as_str(&self) -> &str {
        match self {
            RuleClass::Genrule => "genrule",
            RuleClass::GoPrefix => "_go_prefix_rule",
            RuleClass::ProtoCompile => "proto_compile",
            RuleClass::ProtoLibrary => "proto_library",
            RuleClass::GoProtoCompiler => "go_proto_compiler",
            RuleClass::GoLibrary => "go_library",
            RuleClass::GoProtoLibrary => "go_proto_library",
            RuleClass::GoBinary => "go_binary",
            RuleClass::Other(name) => name,
        }
    }

    /// Returns true for classes whose sources end up in the GOPATH.
    pub fn is_go_producing(&self) -> bool {
        matches!(
            self,
            RuleClass::GoLibrary
                | RuleClass::GoProtoLibrary
                | RuleClass::GoBinary
        )
    }
}

impl From<String> for RuleClass {
    fn from(name: String) -> Self {
        RuleClass::from_class_name(&name)
    }
}

impl From<RuleClass> for String {
    fn from(class: RuleClass) -> Self {
        class.as_str().to_owned()
    }
}

impl fmt::Display for RuleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
