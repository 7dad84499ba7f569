use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

use libprojsnap_core::error::SnapError;
use libprojsnap_core::host::{capture_global_properties, BuildHost};
use libprojsnap_core::loader::{LoaderFactory, ProjectLoader};
use libprojsnap_core::types::GlobalProperties;
use tracing::debug;

use crate::error::IpcError;
use crate::loader::ProcessLoader;
use crate::READER_BINARY_NAME;

/// Creates a [`ProcessLoader`] per project, each with a fresh snapshot of the
/// host's global properties
#[derive(Debug, Clone)]
pub struct ProcessLoaderFactory {
    reader: PathBuf,
    overrides: GlobalProperties,
    fallback_command: Vec<String>,
}

impl ProcessLoaderFactory {
    pub fn new(reader: impl Into<PathBuf>) -> Self {
        Self {
            reader: reader.into(),
            overrides: GlobalProperties::new(),
            fallback_command: Vec::new(),
        }
    }

    /// Factory for the reader found by [`find_reader_binary`]
    pub fn discover(configured: Option<&Path>) -> Result<Self, IpcError> {
        Ok(Self::new(find_reader_binary(configured)?))
    }

    /// Properties applied on top of whatever the host reports
    pub fn with_overrides(mut self, overrides: GlobalProperties) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_fallback_command(mut self, command: Vec<String>) -> Self {
        self.fallback_command = command;
        self
    }

    pub fn reader(&self) -> &Path {
        &self.reader
    }
}

impl LoaderFactory for ProcessLoaderFactory {
    fn create(&self, host: &dyn BuildHost) -> Result<Box<dyn ProjectLoader>, SnapError> {
        let mut properties = capture_global_properties(host)?;
        for (name, value) in self.overrides.iter() {
            properties.set(name, value);
        }
        Ok(Box::new(
            ProcessLoader::new(&self.reader, properties).with_fallback_command(self.fallback_command.clone()),
        ))
    }

    fn dispose(&mut self) {
        // every reader process has already exited by the time its load returns
        debug!(reader = %self.reader.display(), "process loader factory disposed");
    }
}

/// Locate the reader executable
///
/// A configured path must exist. Otherwise the reader is looked for next to
/// the current executable, then on `PATH`.
pub fn find_reader_binary(configured: Option<&Path>) -> Result<PathBuf, IpcError> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(IpcError::ReaderNotFound(path.to_path_buf()));
    }

    let file_name = format!("{}{}", READER_BINARY_NAME, EXE_SUFFIX);
    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    which::which(READER_BINARY_NAME).map_err(|_| IpcError::ReaderNotFound(PathBuf::from(file_name)))
}
