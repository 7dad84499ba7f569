//! Project-model collaborator
//!
//! Evaluating a project file (imports, conditions, item globs) is delegated to
//! a [`ProjectEvaluator`]. The reader only shapes its inputs and serializes its
//! output.

pub mod condition;
pub mod fallback;
pub mod project_file;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{GlobalProperties, ProjectInfo};
use crate::xml::XmlError;

pub use fallback::{CommandFallback, ReferenceFallback};
pub use project_file::ProjectFileEvaluator;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("invalid project XML: {0}")]
    Xml(#[from] XmlError),

    #[error("invalid condition `{condition}`: {message}")]
    Condition { condition: String, message: String },

    #[error("invalid include pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },

    #[error("unsupported project element: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Evaluates a project file under a set of global properties
pub trait ProjectEvaluator: Send + Sync {
    fn evaluate(&self, path: &Path, properties: &GlobalProperties) -> Result<ProjectInfo, EvaluationError>;
}

impl<F> ProjectEvaluator for F
where
    F: Fn(&Path, &GlobalProperties) -> Result<ProjectInfo, EvaluationError> + Send + Sync,
{
    fn evaluate(&self, path: &Path, properties: &GlobalProperties) -> Result<ProjectInfo, EvaluationError> {
        self(path, properties)
    }
}

/// Language tag for a project file, from its extension
pub fn language_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("vbproj") => "Visual Basic",
        Some("fsproj") => "F#",
        _ => "C#",
    }
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve_against(base: &Path, path: &str) -> PathBuf {
    let normalized = path.replace('\\', "/");
    let candidate = Path::new(&normalized);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_for_extension() {
        assert_eq!(language_for(Path::new("a/B.vbproj")), "Visual Basic");
        assert_eq!(language_for(Path::new("a/B.FSPROJ")), "F#");
        assert_eq!(language_for(Path::new("a/B.csproj")), "C#");
    }

    #[test]
    fn test_resolve_against_normalizes_backslashes() {
        let resolved = resolve_against(Path::new("/work/App"), r"..\Lib\Lib.csproj");
        assert_eq!(resolved, Path::new("/work/App/../Lib/Lib.csproj"));
    }
}
