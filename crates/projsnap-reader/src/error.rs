use libprojsnap_core::SnapError;
use libprojsnap_ipc::IpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error(transparent)]
    Snap(#[from] SnapError),

    #[error(transparent)]
    Context(#[from] IpcError),

    #[error("failed to read context from stdin: {0}")]
    Stdin(#[from] std::io::Error),
}
