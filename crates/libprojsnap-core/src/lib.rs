//! Core library for projsnap
//!
//! A build-wide cache of project snapshots. Each snapshot is the evaluated
//! shape of one project file, loaded once per build and shared by every task
//! that asks for it. Evaluation can run in an isolated reader that exchanges
//! snapshots as XML.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod host;
pub mod loader;
pub mod paths;
pub mod protocol;
pub mod reader;
pub mod solution;
pub mod task;
pub mod types;
pub mod workspace;
pub mod xml;

pub use error::SnapError;
pub use host::{BuildHost, LogLevel, StandaloneHost};
pub use loader::{InProcessLoaderFactory, LoaderFactory, ProjectLoader};
pub use reader::{ProjectReader, ReaderOutput};
pub use types::{GlobalProperties, ProjectId, ProjectInfo};
pub use workspace::{CancellationToken, Project, SnapshotWorkspace};
