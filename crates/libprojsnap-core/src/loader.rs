//! Loader abstraction between the workspace and whatever evaluates projects

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::SnapError;
use crate::evaluation::{ProjectEvaluator, ProjectFileEvaluator, ReferenceFallback};
use crate::host::{capture_global_properties, BuildHost};
use crate::reader::ProjectReader;
use crate::types::{GlobalProperties, ProjectInfo};

/// Loads exactly one project
pub trait ProjectLoader {
    fn load(&mut self, path: &Path) -> Result<ProjectInfo, SnapError>;
}

/// Creates loaders bound to a host's current global properties
pub trait LoaderFactory {
    fn create(&self, host: &dyn BuildHost) -> Result<Box<dyn ProjectLoader>, SnapError>;

    /// Release resources shared by every loader this factory created
    fn dispose(&mut self) {}
}

/// Runs the reader in the calling process
pub struct InProcessLoader {
    reader: Arc<ProjectReader>,
    properties: GlobalProperties,
    used: bool,
}

impl InProcessLoader {
    pub fn new(reader: Arc<ProjectReader>, properties: GlobalProperties) -> Self {
        Self {
            reader,
            properties,
            used: false,
        }
    }
}

impl ProjectLoader for InProcessLoader {
    fn load(&mut self, path: &Path) -> Result<ProjectInfo, SnapError> {
        if self.used {
            return Err(SnapError::LoaderReused);
        }
        self.used = true;
        self.reader.read(path, &self.properties)
    }
}

pub struct InProcessLoaderFactory {
    reader: Arc<ProjectReader>,
    overrides: GlobalProperties,
}

impl Default for InProcessLoaderFactory {
    fn default() -> Self {
        Self::new(Arc::new(ProjectFileEvaluator::new()))
    }
}

impl InProcessLoaderFactory {
    pub fn new(evaluator: Arc<dyn ProjectEvaluator>) -> Self {
        Self::from_reader(ProjectReader::new(evaluator))
    }

    pub fn from_reader(reader: ProjectReader) -> Self {
        Self {
            reader: Arc::new(reader),
            overrides: GlobalProperties::new(),
        }
    }

    pub fn with_fallback(evaluator: Arc<dyn ProjectEvaluator>, fallback: Box<dyn ReferenceFallback>) -> Self {
        Self::from_reader(ProjectReader::new(evaluator).with_fallback(fallback))
    }

    /// Properties applied on top of whatever the host reports
    pub fn with_overrides(mut self, overrides: GlobalProperties) -> Self {
        self.overrides = overrides;
        self
    }
}

impl LoaderFactory for InProcessLoaderFactory {
    fn create(&self, host: &dyn BuildHost) -> Result<Box<dyn ProjectLoader>, SnapError> {
        let mut properties = capture_global_properties(host)?;
        for (name, value) in self.overrides.iter() {
            properties.set(name, value);
        }
        debug!(properties = properties.len(), "created in-process loader");
        Ok(Box::new(InProcessLoader::new(Arc::clone(&self.reader), properties)))
    }
}
