//! Isolated project reader
//!
//! Evaluates one project file under a set of global properties and produces
//! its wire snapshot. The same logic runs in-process and inside the
//! `projsnap-reader` executable.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::SnapError;
use crate::evaluation::{ProjectEvaluator, ProjectFileEvaluator, ReferenceFallback};
use crate::paths;
use crate::protocol;
use crate::solution::apply_solution_configuration;
use crate::types::{GlobalProperties, ProjectInfo};

/// Where a reader running out of process delivers its snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderOutput {
    Stdout,
    File(PathBuf),
}

impl ReaderOutput {
    pub fn deliver(&self, xml: &str) -> Result<(), SnapError> {
        match self {
            ReaderOutput::Stdout => {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                lock.write_all(xml.as_bytes())?;
                lock.flush()?;
            }
            ReaderOutput::File(path) => std::fs::write(path, xml)?,
        }
        Ok(())
    }
}

pub struct ProjectReader {
    evaluator: Arc<dyn ProjectEvaluator>,
    fallback: Option<Box<dyn ReferenceFallback>>,
}

impl Default for ProjectReader {
    fn default() -> Self {
        Self::new(Arc::new(ProjectFileEvaluator::new()))
    }
}

impl fmt::Debug for ProjectReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectReader")
            .field("fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}

impl ProjectReader {
    pub fn new(evaluator: Arc<dyn ProjectEvaluator>) -> Self {
        Self {
            evaluator,
            fallback: None,
        }
    }

    /// Resolve metadata references this way when evaluation finds none
    pub fn with_fallback(mut self, fallback: Box<dyn ReferenceFallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Evaluate `path` and return its snapshot
    pub fn read(&self, path: &Path, properties: &GlobalProperties) -> Result<ProjectInfo, SnapError> {
        let path = paths::absolute(path)?;
        if !path.is_file() {
            return Err(SnapError::NotFound(path));
        }

        let mut properties = properties.clone();
        apply_solution_configuration(&path, &mut properties)?;

        info!(project = %path.display(), "evaluating project");
        let mut project = self
            .evaluator
            .evaluate(&path, &properties)
            .map_err(|e| SnapError::evaluation(&path, e))?;

        if project.metadata_references.is_empty() {
            if let Some(fallback) = &self.fallback {
                match fallback.resolve(&path) {
                    Ok(references) if !references.is_empty() => {
                        debug!(
                            project = %path.display(),
                            count = references.len(),
                            "metadata references resolved by fallback"
                        );
                        project.metadata_references = references;
                    }
                    Ok(_) => debug!(project = %path.display(), "reference fallback found nothing"),
                    Err(e) => debug!(project = %path.display(), "reference fallback failed: {}", e),
                }
            }
        }

        Ok(project)
    }

    /// Evaluate `path` and return its wire text
    pub fn read_xml(&self, path: &Path, properties: &GlobalProperties) -> Result<String, SnapError> {
        let project = self.read(path, properties)?;
        Ok(protocol::write_project(&project))
    }
}
