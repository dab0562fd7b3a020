//! Classification of `srcs` entries into generated and literal files.

use bazel_gopath_schemas::Label;

use crate::error::ProjectError;
use crate::index::BuildIndex;

/// File extensions that belong in a Go package directory.
const SOURCE_EXTENSIONS: &[&str] = &[".go", ".s", ".S", ".h"];

/// What a `srcs` label refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceArtifact {
    /// The label names a generating rule; each output is a generated file.
    Generated(Vec<Label>),
    /// The label names a checked-in source file.
    Literal(Label),
    /// Not something that belongs in the GOPATH (data files, `.c`, ...).
    Ignored,
}

/// Classifies one `srcs` label.
///
/// # Errors
///
/// Fails if `src` or one of its generated outputs is not a valid label.
pub fn classify_source(
    src: &str,
    index: &BuildIndex,
) -> Result<SourceArtifact, ProjectError> {
    if let Some(outputs) = index.generated_outputs(src) {
        let outputs = outputs
            .iter()
            .map(|output| Label::parse(output))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(SourceArtifact::Generated(outputs));
    }

    let label = Label::parse(src)?;
    if is_source_file(label.name()) {
        Ok(SourceArtifact::Literal(label))
    } else {
        Ok(SourceArtifact::Ignored)
    }
}

fn is_source_file(name: &str) -> bool {
    SOURCE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}
