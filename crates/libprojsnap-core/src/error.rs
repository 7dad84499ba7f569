use std::path::PathBuf;

use thiserror::Error;

use crate::evaluation::EvaluationError;
use crate::protocol::ProtocolError;
use crate::xml::XmlError;

/// Main error type for projsnap operations
#[derive(Debug, Error)]
pub enum SnapError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("project file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("loader already initialized with a project")]
    LoaderReused,

    #[error("unsupported build host: {0}")]
    UnsupportedHost(String),

    #[error("failed to evaluate {}: {message}", path.display())]
    Evaluation { path: PathBuf, message: String },

    #[error("isolated load of {} failed: {message}", path.display())]
    Transport { path: PathBuf, message: String },

    #[error("malformed project snapshot: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SnapError {
    /// Wrap an evaluator failure with the project it was evaluating
    pub fn evaluation(path: impl Into<PathBuf>, err: EvaluationError) -> Self {
        SnapError::Evaluation {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Get the error code for JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            SnapError::InvalidArgs(_) => "invalid_args",
            SnapError::NotFound(_) => "not_found",
            SnapError::LoaderReused => "loader_reused",
            SnapError::UnsupportedHost(_) => "unsupported_host",
            SnapError::Evaluation { .. } => "evaluation_failed",
            SnapError::Transport { .. } => "transport_error",
            SnapError::Protocol(_) => "protocol_error",
            SnapError::Cancelled => "cancelled",
            SnapError::Io(_) => "io_error",
            SnapError::Xml(_) => "invalid_xml",
            SnapError::TomlParse(_) => "invalid_args",
            SnapError::TomlSerialize(_) => "internal_error",
            SnapError::Json(_) => "internal_error",
            SnapError::Internal(_) => "internal_error",
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            SnapError::InvalidArgs(_) => 2,
            SnapError::TomlParse(_) => 2,
            SnapError::NotFound(_) => 3,
            SnapError::Evaluation { .. } => 4,
            SnapError::Xml(_) => 4,
            SnapError::Transport { .. } => 5,
            SnapError::Protocol(_) => 5,
            SnapError::UnsupportedHost(_) => 6,
            SnapError::Cancelled => 130,
            _ => 1,
        }
    }

    /// Get actionable suggestions for fixing the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            SnapError::NotFound(_) => vec!["Check the project path; relative paths resolve against the working directory"],
            SnapError::Transport { .. } => vec![
                "Make sure projsnap-reader is installed next to projsnap or on PATH",
                "Or use 'projsnap load --in-process' to skip process isolation",
            ],
            SnapError::UnsupportedHost(_) => vec![
                "The build host exposes neither known engine state shape",
            ],
            SnapError::Evaluation { .. } => vec![
                "Run 'projsnap read <project>' to see the evaluation error in isolation",
            ],
            SnapError::TomlParse(_) => vec!["Check projsnap.toml for syntax errors"],
            _ => vec![],
        }
    }

    /// Whether this error is a precondition violation that must never be retried
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SnapError::NotFound(_) | SnapError::LoaderReused | SnapError::UnsupportedHost(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_path() {
        let err = SnapError::NotFound(PathBuf::from("/src/Lib/Lib.csproj"));
        assert!(err.to_string().contains("/src/Lib/Lib.csproj"));
        assert_eq!(err.error_code(), "not_found");
        assert_eq!(err.exit_code(), 3);
        assert!(err.is_precondition());
    }

    #[test]
    fn test_transport_is_not_precondition() {
        let err = SnapError::Transport {
            path: PathBuf::from("a.csproj"),
            message: "boom".to_string(),
        };
        assert!(!err.is_precondition());
        assert!(!err.suggestions().is_empty());
    }
}
