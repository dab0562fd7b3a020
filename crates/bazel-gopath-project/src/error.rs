//! Error types for the bazel-gopath-project crate.

use std::backtrace::Backtrace;
use std::fmt;
use std::path::PathBuf;

use bazel_gopath_schemas::ParseLabelError;
use camino::Utf8PathBuf;

/// Error type for fatal projection failures.
///
/// Every variant aborts the run. Targets that merely cannot be placed (no
/// import path) are not errors; they are reported as
/// [`crate::TargetOutcome::Skipped`].
#[derive(Debug)]
pub struct ProjectError {
    kind: ProjectErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods
/// instead.
#[derive(Debug)]
pub(crate) enum ProjectErrorKind {
    /// A label in the graph is missing `//` or `:`.
    MalformedLabel(ParseLabelError),
    /// A `go_proto_library` points at a `proto_library` with no known sources.
    MissingProtoSources { rule: String, proto: String },
    /// The query subprocess could not be started.
    QuerySpawn {
        program: PathBuf,
        source: std::io::Error,
    },
    /// The query output is not a valid `QueryResult`.
    Decode(prost::DecodeError),
    /// A configured path is not valid UTF-8.
    NonUtf8Path(PathBuf),
    /// Creating a directory failed for a reason other than "already exists".
    CreateDir {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    /// Creating a symlink failed for a reason other than "already exists".
    Symlink {
        dest: Utf8PathBuf,
        target: Utf8PathBuf,
        source: std::io::Error,
    },
    /// A destination directory lies outside the GOPATH `src` root.
    OutsideRoot {
        path: Utf8PathBuf,
        root: Utf8PathBuf,
    },
}

impl ProjectError {
    /// Creates an error from an error kind, capturing a backtrace.
    pub(crate) fn new(kind: ProjectErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub(crate) fn missing_proto_sources(rule: &str, proto: &str) -> Self {
        Self::new(ProjectErrorKind::MissingProtoSources {
            rule: rule.to_owned(),
            proto: proto.to_owned(),
        })
    }

    pub(crate) fn query_spawn(
        program: PathBuf,
        source: std::io::Error,
    ) -> Self {
        Self::new(ProjectErrorKind::QuerySpawn { program, source })
    }

    pub(crate) fn create_dir(
        path: Utf8PathBuf,
        source: std::io::Error,
    ) -> Self {
        Self::new(ProjectErrorKind::CreateDir { path, source })
    }

    pub(crate) fn outside_root(path: Utf8PathBuf, root: Utf8PathBuf) -> Self {
        Self::new(ProjectErrorKind::OutsideRoot { path, root })
    }

    pub(crate) fn symlink(
        dest: Utf8PathBuf,
        target: Utf8PathBuf,
        source: std::io::Error,
    ) -> Self {
        Self::new(ProjectErrorKind::Symlink {
            dest,
            target,
            source,
        })
    }

    /// Creates an error for a configured path that is not valid UTF-8.
    pub fn non_utf8_path(path: PathBuf) -> Self {
        Self::new(ProjectErrorKind::NonUtf8Path(path))
    }

    /// Returns true if the build graph itself is malformed: a label without
    /// its separators, or a proto library with no recorded sources.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self.kind,
            ProjectErrorKind::MalformedLabel(_)
                | ProjectErrorKind::MissingProtoSources { .. }
        )
    }

    /// Returns true if the query subprocess could not be started.
    pub fn is_query(&self) -> bool {
        matches!(self.kind, ProjectErrorKind::QuerySpawn { .. })
    }

    /// Returns true if the query output could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self.kind, ProjectErrorKind::Decode(_))
    }

    /// Returns true if a configured path was unusable.
    pub fn is_config(&self) -> bool {
        matches!(self.kind, ProjectErrorKind::NonUtf8Path(_))
    }

    /// Returns true if materializing the GOPATH tree failed.
    pub fn is_io(&self) -> bool {
        matches!(
            self.kind,
            ProjectErrorKind::CreateDir { .. }
                | ProjectErrorKind::Symlink { .. }
                | ProjectErrorKind::OutsideRoot { .. }
        )
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for ProjectErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectErrorKind::MalformedLabel(err) => write!(f, "{err}"),
            ProjectErrorKind::MissingProtoSources { rule, proto } => {
                write!(
                    f,
                    "invalid go_proto_library {rule:?}: \
                     missing srcs for {proto:?}"
                )
            }
            ProjectErrorKind::QuerySpawn { program, source } => {
                write!(
                    f,
                    "failed to run query with {}: {source}",
                    program.display()
                )
            }
            ProjectErrorKind::Decode(err) => {
                write!(f, "failed to decode query output: {err}")
            }
            ProjectErrorKind::NonUtf8Path(path) => {
                write!(f, "path contains invalid UTF-8: {}", path.display())
            }
            ProjectErrorKind::CreateDir { path, source } => {
                write!(f, "failed to create directory {path}: {source}")
            }
            ProjectErrorKind::Symlink {
                dest,
                target,
                source,
            } => {
                write!(f, "failed to symlink {dest} -> {target}: {source}")
            }
            ProjectErrorKind::OutsideRoot { path, root } => {
                write!(f, "refusing to create {path}: outside of {root}")
            }
        }
    }
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;

        // Backtrace (will be empty unless RUST_BACKTRACE is set).
        write!(f, "{}", self.backtrace)
    }
}

impl std::error::Error for ProjectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ProjectErrorKind::MalformedLabel(err) => Some(err),
            ProjectErrorKind::Decode(err) => Some(err),
            ProjectErrorKind::QuerySpawn { source, .. }
            | ProjectErrorKind::CreateDir { source, .. }
            | ProjectErrorKind::Symlink { source, .. } => Some(source),
            ProjectErrorKind::MissingProtoSources { .. }
            | ProjectErrorKind::NonUtf8Path(_)
            | ProjectErrorKind::OutsideRoot { .. } => None,
        }
    }
}

impl From<ParseLabelError> for ProjectError {
    fn from(err: ParseLabelError) -> Self {
        Self::new(ProjectErrorKind::MalformedLabel(err))
    }
}

impl From<prost::DecodeError> for ProjectError {
    fn from(err: prost::DecodeError) -> Self {
        Self::new(ProjectErrorKind::Decode(err))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::io;

    use bazel_gopath_schemas::Label;

    use super::*;

    #[test]
    fn test_malformed_label_from() {
        let err =
            ProjectError::from(Label::parse("no-separators").unwrap_err());

        assert!(err.is_malformed_input());
        assert!(!err.is_io());
        assert!(!err.is_query());
        assert!(err.to_string().contains("malformed label"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_missing_proto_sources() {
        let err = ProjectError::missing_proto_sources(
            "//api:go_default_library",
            "//api:api_proto",
        );

        assert!(err.is_malformed_input());
        assert!(err.to_string().contains("//api:api_proto"));
        assert!(err.source().is_none());
    }

    #[test]
    fn test_decode_from() {
        let decode_err =
            bazel_gopath_schemas::decode_query_result(&[0xff, 0xff, 0xff])
                .unwrap_err();
        let err = ProjectError::from(decode_err);

        assert!(err.is_decode());
        assert!(!err.is_malformed_input());
        assert!(err.to_string().contains("failed to decode query output"));
    }

    #[test]
    fn test_io_kinds() {
        let mkdir = ProjectError::create_dir(
            "/out/src".into(),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(mkdir.is_io());
        assert!(mkdir.to_string().contains("/out/src"));

        let link = ProjectError::symlink(
            "/out/src/a.go".into(),
            "/ws/a.go".into(),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(link.is_io());
        assert!(link.to_string().contains("/out/src/a.go -> /ws/a.go"));
        assert!(link.source().is_some());

        let outside = ProjectError::outside_root(
            "/etc/pkg".into(),
            "/out/src".into(),
        );
        assert!(outside.is_io());
        assert!(outside.to_string().contains("/etc/pkg"));
    }

    #[test]
    fn test_query_spawn() {
        let err = ProjectError::query_spawn(
            PathBuf::from("/no/bazel"),
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.is_query());
        assert!(err.to_string().contains("/no/bazel"));
    }

    #[test]
    fn test_debug_impl() {
        let err = ProjectError::non_utf8_path(PathBuf::from("x"));
        assert!(err.is_config());
        let debug_str = format!("{err:?}");
        assert!(debug_str.contains("ProjectError"));
    }
}
