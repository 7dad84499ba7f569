//! Transport error types

use std::path::{Path, PathBuf};

use libprojsnap_core::error::SnapError;
use libprojsnap_core::protocol::ProtocolError;
use libprojsnap_core::xml::XmlError;
use thiserror::Error;

/// Errors that can occur while running a reader process
#[derive(Error, Debug)]
pub enum IpcError {
    /// The reader executable does not exist
    #[error("reader executable not found: {}", .0.display())]
    ReaderNotFound(PathBuf),

    /// The reader could not be started
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// The reader exited non-zero or wrote to stderr
    #[error("reader failed ({status}): {stderr}")]
    ReaderFailed { status: String, stderr: String },

    /// The reader's stdout was not a valid snapshot
    #[error("invalid snapshot from reader: {0}")]
    Protocol(#[from] ProtocolError),

    /// The context document is malformed
    #[error("invalid context document: {0}")]
    Context(String),

    #[error("invalid context XML: {0}")]
    Xml(#[from] XmlError),

    #[error("loader already used")]
    LoaderReused,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IpcError {
    /// Convert to the workspace error for a load of `project`
    pub fn into_snap_error(self, project: &Path) -> SnapError {
        match self {
            IpcError::LoaderReused => SnapError::LoaderReused,
            other => SnapError::Transport {
                path: project.to_path_buf(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_failure_surfaces_stderr_verbatim() {
        let err = IpcError::ReaderFailed {
            status: "exit status: 1".to_string(),
            stderr: "error: project file not found: /x/A.csproj".to_string(),
        }
        .into_snap_error(Path::new("/x/A.csproj"));

        match err {
            SnapError::Transport { path, message } => {
                assert_eq!(path, PathBuf::from("/x/A.csproj"));
                assert!(message.contains("error: project file not found: /x/A.csproj"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_reuse_stays_a_precondition() {
        let err = IpcError::LoaderReused.into_snap_error(Path::new("/x/A.csproj"));
        assert!(err.is_precondition());
    }
}
