//! Process isolation for projsnap
//!
//! This crate provides:
//! - The context document sent to a reader process (ContextDocument)
//! - A single-use loader that runs `projsnap-reader` (ProcessLoader)
//! - The factory the workspace uses to create them (ProcessLoaderFactory)
//! - Reader binary discovery

pub mod context;
pub mod error;
pub mod factory;
pub mod loader;

pub use context::ContextDocument;
pub use error::IpcError;
pub use factory::{find_reader_binary, ProcessLoaderFactory};
pub use loader::ProcessLoader;

/// File name of the reader executable, without platform suffix
pub const READER_BINARY_NAME: &str = "projsnap-reader";

/// Environment variable enabling reader diagnostics on stderr
pub const READER_LOG_ENV: &str = "PROJSNAP_READER_LOG";

/// Reader flag passing one word of the reference fallback command line
pub const FALLBACK_COMMAND_FLAG: &str = "--fallback-command";
