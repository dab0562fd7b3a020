//! Projection of Go targets into the GOPATH symlink tree.
//!
//! Each Go-producing target is first planned (a pure computation of
//! destination and source paths) and then materialized. Materializing is
//! idempotent: directories and symlinks that already exist are left alone,
//! so the projection can be rerun over an existing tree. Stale entries from
//! earlier runs are never removed.

use std::fs;
use std::io;

use bazel_gopath_schemas::{BuildGraph, Label, Rule, RuleClass};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, debug_span, info, warn};

use crate::error::ProjectError;
use crate::index::BuildIndex;
use crate::layout::Layout;
use crate::resolve::{ImportPath, ImportPathResolver};
use crate::sources::{SourceArtifact, classify_source};

/// Target name that rules_go treats as a package's implicit library.
pub const DEFAULT_LIBRARY_NAME: &str = "go_default_library";

/// Whether a link points into the source tree or at a build output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Literal,
    Generated,
}

/// One symlink to create: `dest` will point at `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub dest: Utf8PathBuf,
    pub source: Utf8PathBuf,
    pub kind: LinkKind,
}

/// Why a target was left out of the GOPATH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No strategy could determine an import path.
    NoImportPath,
    /// The import path would place files outside `<gopath>/src`.
    InvalidImportPath(String),
}

/// The links planned for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPlan {
    pub import_path: ImportPath,
    pub links: Vec<Link>,
}

/// Result of planning a single target. Fatal problems are returned as
/// [`ProjectError`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Planned(TargetPlan),
    Skipped(SkipReason),
}

/// A target that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTarget {
    pub label: String,
    pub reason: SkipReason,
}

/// Summary of a projection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionReport {
    /// Targets that resolved to an import path.
    pub projected: usize,
    pub skipped: Vec<SkippedTarget>,
    pub links_created: usize,
    /// Links that were already present, from an earlier or concurrent run.
    pub links_existing: usize,
}

/// Outcome of creating a single symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkStatus {
    Created,
    Existing,
}

/// Plans and materializes the GOPATH for a fully built [`BuildIndex`].
#[derive(Debug)]
pub struct Projector<'a> {
    layout: &'a Layout,
    index: &'a BuildIndex,
    resolver: ImportPathResolver,
}

impl<'a> Projector<'a> {
    pub fn new(layout: &'a Layout, index: &'a BuildIndex) -> Self {
        Self::with_resolver(layout, index, ImportPathResolver::default())
    }

    pub fn with_resolver(
        layout: &'a Layout,
        index: &'a BuildIndex,
        resolver: ImportPathResolver,
    ) -> Self {
        Self {
            layout,
            index,
            resolver,
        }
    }

    /// Projects every Go-producing target of `graph`, in graph order.
    ///
    /// # Errors
    ///
    /// Stops at the first fatal error: a malformed label, a
    /// `go_proto_library` whose proto sources are unknown, or a filesystem
    /// failure other than "already exists". Links created before the error
    /// stay in place.
    pub fn project(
        &self,
        graph: &BuildGraph,
    ) -> Result<ProjectionReport, ProjectError> {
        let src_root = self.layout.src_root();
        fs::create_dir_all(&src_root)
            .map_err(|e| ProjectError::create_dir(src_root.clone(), e))?;

        let mut report = ProjectionReport::default();
        for rule in graph.rules().filter(|r| r.class.is_go_producing()) {
            let _span = debug_span!("target", rule = %rule.name).entered();
            match self.plan_target(rule)? {
                TargetOutcome::Skipped(reason) => {
                    warn!(
                        rule = %rule.name,
                        ?reason,
                        "failed to discover import path, skipping"
                    );
                    report.skipped.push(SkippedTarget {
                        label: rule.name.clone(),
                        reason,
                    });
                }
                TargetOutcome::Planned(plan) => {
                    report.projected += 1;
                    for link in &plan.links {
                        match materialize(link, &src_root)? {
                            LinkStatus::Created => report.links_created += 1,
                            LinkStatus::Existing => report.links_existing += 1,
                        }
                    }
                }
            }
        }

        info!(
            projected = report.projected,
            skipped = report.skipped.len(),
            links_created = report.links_created,
            links_existing = report.links_existing,
            "projection.complete"
        );
        Ok(report)
    }

    /// Computes the links for one Go-producing rule without touching the
    /// filesystem.
    pub fn plan_target(
        &self,
        rule: &Rule,
    ) -> Result<TargetOutcome, ProjectError> {
        let label = Label::parse(&rule.name)?;
        let Some(import_path) = self.resolver.resolve(rule, &label, self.index)?
        else {
            return Ok(TargetOutcome::Skipped(SkipReason::NoImportPath));
        };
        let (Some(import_dir), Some(package_dir)) = (
            relative_dir(&import_path.path),
            package_dir(&import_path.path, &label),
        ) else {
            return Ok(TargetOutcome::Skipped(SkipReason::InvalidImportPath(
                import_path.path,
            )));
        };
        let mut links = Vec::new();

        for src in rule.attr_list("srcs") {
            match classify_source(src, self.index)? {
                SourceArtifact::Generated(outputs) => {
                    for output in outputs {
                        links.push(Link {
                            dest: self.dest_in(&package_dir, output.name()),
                            source: self.layout.generated_source(&output),
                            kind: LinkKind::Generated,
                        });
                    }
                }
                SourceArtifact::Literal(file) => {
                    links.push(Link {
                        dest: self.dest_in(&package_dir, file.name()),
                        source: self.layout.literal_source(&file),
                        kind: LinkKind::Literal,
                    });
                }
                SourceArtifact::Ignored => {
                    debug!(%src, "not a Go package source, ignoring");
                }
            }
        }

        if rule.class == RuleClass::GoProtoLibrary {
            links.extend(self.plan_proto_outputs(rule, &import_dir)?);
        }

        Ok(TargetOutcome::Planned(TargetPlan { import_path, links }))
    }

    /// Links for the files a `go_proto_library` generates from its
    /// `proto_library`, one per (compiler, proto source) pair.
    fn plan_proto_outputs(
        &self,
        rule: &Rule,
        proto_dir: &Utf8Path,
    ) -> Result<Vec<Link>, ProjectError> {
        let Some(proto) = rule.attr_str("proto") else {
            return Ok(Vec::new());
        };
        debug!(rule = %rule.name, %proto, "planning go_proto_library");
        let srcs = self.index.proto_sources(proto).ok_or_else(|| {
            ProjectError::missing_proto_sources(&rule.name, proto)
        })?;

        let mut links = Vec::new();
        for compiler in rule.attr_list("compilers") {
            let Some(suffix) = self.index.proto_suffix(compiler) else {
                debug!(%compiler, "compiler declares no suffix, skipping");
                continue;
            };
            for src in srcs {
                let proto_file = Label::parse(src)?;
                let name = proto_file.name().replacen(".proto", suffix, 1);
                let generated = proto_file.sibling(name);
                links.push(Link {
                    dest: self.dest_in(proto_dir, generated.name()),
                    source: self.layout.generated_source(&generated),
                    kind: LinkKind::Generated,
                });
            }
        }
        Ok(links)
    }

    fn dest_in(&self, package_dir: &Utf8Path, file_name: &str) -> Utf8PathBuf {
        self.layout.destination(&package_dir.join(base_name(file_name)))
    }
}

/// The package directory, relative to `src/`, for a target's files.
///
/// The default library sits directly at its import path. Any other target
/// gets `<package>/<name>` appended so that several libraries sharing a
/// prefix do not collide. `None` if the result would leave `src/`.
fn package_dir(import_path: &str, label: &Label) -> Option<Utf8PathBuf> {
    if label.name() == DEFAULT_LIBRARY_NAME {
        relative_dir(import_path)
    } else {
        relative_dir(&format!(
            "{import_path}/{}/{}",
            label.package(),
            label.name()
        ))
    }
}

/// Normalizes a slash-separated path into relative components.
///
/// Leading, doubled and trailing slashes and `.` segments are dropped, so
/// `/abs/x` becomes `abs/x`. Returns `None` for a `..` segment or when
/// nothing is left.
fn relative_dir(path: &str) -> Option<Utf8PathBuf> {
    let mut dir = Utf8PathBuf::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            _ => dir.push(segment),
        }
    }
    (!dir.as_str().is_empty()).then_some(dir)
}

fn base_name(file_name: &str) -> &str {
    file_name.rsplit('/').next().unwrap_or(file_name)
}

/// Creates `link.dest`'s parent directories and the symlink itself.
fn materialize(
    link: &Link,
    src_root: &Utf8Path,
) -> Result<LinkStatus, ProjectError> {
    if let Some(parent) = link.dest.parent() {
        ensure_dir(parent, src_root)?;
    }

    match symlink(&link.source, &link.dest) {
        Ok(()) => {
            debug!(dest = %link.dest, source = %link.source, "linked");
            Ok(LinkStatus::Created)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Ok(LinkStatus::Existing)
        }
        Err(e) => Err(ProjectError::symlink(
            link.dest.clone(),
            link.source.clone(),
            e,
        )),
    }
}

/// Creates `path` and its missing ancestors, bottom-up, stopping at `root`.
///
/// "Already exists" counts as success at every level so that concurrent or
/// repeated runs do not trip over each other. A `path` outside `root` is an
/// error; nothing is created there.
fn ensure_dir(path: &Utf8Path, root: &Utf8Path) -> Result<(), ProjectError> {
    if path == root {
        return Ok(());
    }
    if !path.starts_with(root) {
        return Err(ProjectError::outside_root(
            path.to_owned(),
            root.to_owned(),
        ));
    }
    if let Some(parent) = path.parent() {
        ensure_dir(parent, root)?;
    }

    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(ProjectError::create_dir(path.to_owned(), e)),
    }
}

#[cfg(unix)]
fn symlink(source: &Utf8Path, dest: &Utf8Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(windows)]
fn symlink(source: &Utf8Path, dest: &Utf8Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(source, dest)
}
