//! Lookup tables built from one pass over the build graph.
//!
//! The tables are filled completely before any target is projected: a
//! target early in the query output may reference a prefix or proto
//! compiler declared much later.

use std::collections::HashMap;

use bazel_gopath_schemas::{BuildGraph, Rule, RuleClass};
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

/// Generated filename extension for each `proto_compile` variant, keyed by
/// the token after the last `.` in the rule's name.
const PROTO_COMPILE_EXTENSIONS: &[(&str, &str)] =
    &[("pb", ".pb.go"), ("gw", ".pb.gw.go")];

/// Read-only lookup tables consumed by the projection.
#[derive(Debug, Default)]
pub struct BuildIndex {
    /// `_go_prefix_rule` label → declared import-path prefix.
    prefixes: HashMap<String, String>,
    /// Generating rule label → generated `.go` file labels.
    generated: HashMap<String, Vec<String>>,
    /// `proto_library` label → its `.proto` source labels.
    proto_srcs: HashMap<String, Vec<String>>,
    /// `go_proto_compiler` label → generated filename suffix.
    proto_suffixes: HashMap<String, String>,
}

impl BuildIndex {
    /// Classifies every rule in the graph and records the ones that feed
    /// the projection.
    #[instrument(skip_all, fields(targets = graph.targets.len()))]
    pub fn build(graph: &BuildGraph) -> Self {
        let mut index = BuildIndex::default();
        for rule in graph.rules() {
            index.record(rule);
        }

        info!(
            prefixes = index.prefixes.len(),
            generators = index.generated.len(),
            proto_libraries = index.proto_srcs.len(),
            proto_compilers = index.proto_suffixes.len(),
            "index.built"
        );
        for (label, prefix) in index.prefixes.iter().sorted() {
            info!(%label, %prefix, "index.prefix");
        }

        index
    }

    fn record(&mut self, rule: &Rule) {
        match &rule.class {
            RuleClass::Genrule => {
                let outputs = rule.outputs.iter();
                for output in outputs.filter(|o| o.ends_with(".go")) {
                    self.generated
                        .entry(rule.name.clone())
                        .or_default()
                        .push(output.clone());
                }
            }
            RuleClass::ProtoCompile => {
                debug!(rule = %rule.name, "index.proto_compile");
                let Some(extension) = proto_compile_extension(&rule.name) else {
                    warn!(
                        rule = %rule.name,
                        "unknown proto_compile variant, no outputs recorded"
                    );
                    return;
                };
                for proto in rule.attr_list("protos") {
                    self.generated
                        .entry(rule.name.clone())
                        .or_default()
                        .push(proto.replacen(".proto", extension, 1));
                }
            }
            RuleClass::ProtoLibrary => {
                if let Some(srcs) = rule.attr("srcs") {
                    self.proto_srcs
                        .insert(rule.name.clone(), srcs.as_list().to_vec());
                }
            }
            RuleClass::GoProtoCompiler => {
                debug!(rule = %rule.name, "index.proto_compiler");
                if let Some(suffix) = rule.attr_str("suffix") {
                    self.proto_suffixes
                        .insert(rule.name.clone(), suffix.to_owned());
                }
            }
            RuleClass::GoPrefix => {
                if let Some(prefix) = rule.attr_str("prefix") {
                    self.prefixes.insert(rule.name.clone(), prefix.to_owned());
                }
            }
            RuleClass::GoLibrary
            | RuleClass::GoProtoLibrary
            | RuleClass::GoBinary
            | RuleClass::Other(_) => {}
        }
    }

    /// The import-path prefix declared by a `_go_prefix_rule`.
    pub fn prefix(&self, label: &str) -> Option<&str> {
        self.prefixes.get(label).map(String::as_str)
    }

    /// The generated `.go` file labels of a generating rule, if `label`
    /// names one.
    pub fn generated_outputs(&self, label: &str) -> Option<&[String]> {
        self.generated.get(label).map(Vec::as_slice)
    }

    /// The `.proto` sources of a `proto_library`.
    pub fn proto_sources(&self, label: &str) -> Option<&[String]> {
        self.proto_srcs.get(label).map(Vec::as_slice)
    }

    /// The filename suffix produced by a `go_proto_compiler`.
    pub fn proto_suffix(&self, label: &str) -> Option<&str> {
        self.proto_suffixes.get(label).map(String::as_str)
    }
}

fn proto_compile_extension(rule_name: &str) -> Option<&'static str> {
    let variant = rule_name.rsplit('.').next()?;
    PROTO_COMPILE_EXTENSIONS
        .iter()
        .find(|(token, _)| *token == variant)
        .map(|(_, ext)| *ext)
}
