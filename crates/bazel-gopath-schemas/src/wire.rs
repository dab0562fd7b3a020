//! `bazel query --output=proto` wire format.
//!
//! Declares the subset of Bazel's `build.proto` (package `blaze_query`) that
//! the projection reads, using prost derive macros without a build step.
//! Field numbers match the upstream schema; fields not declared here are
//! skipped by the decoder.

use prost::Message;

use crate::graph::{AttrValue, BuildGraph, Rule, RuleClass, Target};

/// The top-level query response.
#[derive(Clone, PartialEq, Message)]
pub struct QueryResult {
    #[prost(message, repeated, tag = "1")]
    pub target: Vec<WireTarget>,
}

/// One node of the query result.
#[derive(Clone, PartialEq, Message)]
pub struct WireTarget {
    #[prost(enumeration = "TargetType", required, tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub rule: Option<WireRule>,
    #[prost(message, optional, tag = "3")]
    pub source_file: Option<WireFile>,
    #[prost(message, optional, tag = "4")]
    pub generated_file: Option<WireFile>,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    prost::Enumeration,
)]
#[repr(i32)]
pub enum TargetType {
    Rule = 1,
    SourceFile = 2,
    GeneratedFile = 3,
    PackageGroup = 4,
    EnvironmentGroup = 5,
}

/// Source and generated files share the same leading field.
#[derive(Clone, PartialEq, Message)]
pub struct WireFile {
    #[prost(string, required, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct WireRule {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(string, required, tag = "2")]
    pub rule_class: String,
    #[prost(message, repeated, tag = "4")]
    pub attribute: Vec<WireAttribute>,
    #[prost(string, repeated, tag = "5")]
    pub rule_input: Vec<String>,
    #[prost(string, repeated, tag = "6")]
    pub rule_output: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct WireAttribute {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(enumeration = "AttributeType", required, tag = "2")]
    pub r#type: i32,
    #[prost(string, optional, tag = "5")]
    pub string_value: Option<String>,
    #[prost(string, repeated, tag = "6")]
    pub string_list_value: Vec<String>,
}

/// Attribute discriminator. Only the string-shaped kinds are listed by
/// name; other values decode fine and are dropped during conversion.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    prost::Enumeration,
)]
#[repr(i32)]
pub enum AttributeType {
    Integer = 1,
    String = 2,
    Label = 3,
    Output = 4,
    StringList = 5,
    LabelList = 6,
    OutputList = 7,
}

/// Decodes a serialized `QueryResult` into a [`BuildGraph`].
///
/// # Errors
///
/// Returns the prost decode error if `bytes` is not a valid `QueryResult`.
pub fn decode_query_result(
    bytes: &[u8],
) -> Result<BuildGraph, prost::DecodeError> {
    QueryResult::decode(bytes).map(BuildGraph::from)
}

impl From<QueryResult> for BuildGraph {
    fn from(result: QueryResult) -> Self {
        let targets = result
            .target
            .into_iter()
            .filter_map(Target::from_wire)
            .collect();
        BuildGraph { targets }
    }
}

impl Target {
    /// Package groups and environment groups carry no label we care about,
    /// so they are dropped.
    fn from_wire(target: WireTarget) -> Option<Self> {
        if let Some(rule) = target.rule {
            let rule = Rule::from(rule);
            return Some(Target {
                label: rule.name.clone(),
                rule: Some(rule),
            });
        }
        target
            .source_file
            .or(target.generated_file)
            .map(|file| Target {
                label: file.name,
                rule: None,
            })
    }
}

impl From<WireRule> for Rule {
    fn from(rule: WireRule) -> Self {
        let attributes = rule
            .attribute
            .into_iter()
            .filter_map(|attr| {
                let value = attr_value(&attr)?;
                Some((attr.name, value))
            })
            .collect();

        Rule {
            class: RuleClass::from_class_name(&rule.rule_class),
            name: rule.name,
            outputs: rule.rule_output,
            inputs: rule.rule_input,
            attributes,
        }
    }
}

fn attr_value(attr: &WireAttribute) -> Option<AttrValue> {
    match AttributeType::try_from(attr.r#type) {
        Ok(
            AttributeType::StringList
            | AttributeType::LabelList
            | AttributeType::OutputList,
        ) => Some(AttrValue::List(attr.string_list_value.clone())),
        Ok(
            AttributeType::String
            | AttributeType::Label
            | AttributeType::Output,
        ) => attr.string_value.clone().map(AttrValue::Str),
        _ => None,
    }
}
