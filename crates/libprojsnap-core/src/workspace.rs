//! Snapshot workspace: one cached snapshot per project file per build
//!
//! Each path moves from unregistered to `Loading` (visible to cycles back to
//! it) to `Registered`. Failures are never cached: everything a failed
//! top-level request inserted is removed again.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SnapError;
use crate::host::BuildHost;
use crate::loader::LoaderFactory;
use crate::paths::{self, PathKey};
use crate::types::{CompilationOptions, DocumentId, DocumentInfo, ProjectId, ProjectInfo};

/// Cooperative cancellation flag shared between a caller and a load
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SnapError> {
        if self.is_cancelled() {
            Err(SnapError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Registered,
}

/// A document and the content it had when its project was registered
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    pub name: String,
    pub file_path: PathBuf,
    pub folders: Vec<String>,
    #[serde(skip)]
    pub text: Arc<str>,
}

/// Immutable core of a registered project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSnapshot {
    pub id: ProjectId,
    pub name: String,
    pub assembly_name: String,
    pub language: String,
    pub file_path: PathBuf,
    pub output_file_path: PathBuf,
    pub compilation_options: CompilationOptions,
    pub documents: Vec<DocumentSnapshot>,
    pub additional_documents: Vec<DocumentSnapshot>,
    pub metadata_references: Vec<PathBuf>,
}

/// Caller-facing view of a cached project
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    #[serde(flatten)]
    snapshot: Arc<ProjectSnapshot>,
    project_references: Vec<ProjectId>,
    state: LoadState,
}

impl Project {
    pub fn id(&self) -> ProjectId {
        self.snapshot.id
    }

    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    pub fn snapshot(&self) -> &ProjectSnapshot {
        &self.snapshot
    }

    /// References known when this handle was taken; empty for a project
    /// still walking its references
    pub fn project_references(&self) -> &[ProjectId] {
        &self.project_references
    }

    pub fn state(&self) -> LoadState {
        self.state
    }
}

struct Entry {
    snapshot: Arc<ProjectSnapshot>,
    references: Vec<ProjectId>,
    state: LoadState,
}

impl Entry {
    fn handle(&self) -> Project {
        Project {
            snapshot: Arc::clone(&self.snapshot),
            project_references: self.references.clone(),
            state: self.state,
        }
    }
}

pub struct SnapshotWorkspace {
    factory: Option<Box<dyn LoaderFactory>>,
    entries: HashMap<PathKey, Entry>,
    by_id: HashMap<ProjectId, PathKey>,
    order: Vec<PathKey>,
}

impl fmt::Debug for SnapshotWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotWorkspace")
            .field("projects", &self.order)
            .field("disposed", &self.factory.is_none())
            .finish()
    }
}

impl SnapshotWorkspace {
    pub fn new(factory: Box<dyn LoaderFactory>) -> Self {
        Self {
            factory: Some(factory),
            entries: HashMap::new(),
            by_id: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Return the cached project for `path`, loading it and everything it
    /// references on first request
    pub fn get_or_add(&mut self, host: &dyn BuildHost, path: &Path) -> Result<Project, SnapError> {
        self.get_or_add_with_cancel(host, path, &CancellationToken::new())
    }

    pub fn get_or_add_with_cancel(
        &mut self,
        host: &dyn BuildHost,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Project, SnapError> {
        let mut inserted = Vec::new();
        match self.resolve(host, path, cancel, &mut inserted) {
            Ok(key) => self
                .entries
                .get(&key)
                .map(Entry::handle)
                .ok_or_else(|| SnapError::Internal(format!("{} vanished after load", key))),
            Err(e) => {
                if !inserted.is_empty() {
                    debug!(count = inserted.len(), "rolling back partially loaded projects");
                }
                self.rollback(&inserted);
                Err(e)
            }
        }
    }

    fn resolve(
        &mut self,
        host: &dyn BuildHost,
        path: &Path,
        cancel: &CancellationToken,
        inserted: &mut Vec<PathKey>,
    ) -> Result<PathKey, SnapError> {
        cancel.check()?;
        let (full, key) = paths::resolve_project_path(path)?;

        if let Some(entry) = self.entries.get(&key) {
            debug!(project = %full.display(), state = ?entry.state, "workspace cache hit");
            return Ok(key);
        }

        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| SnapError::Internal("workspace has been disposed".to_string()))?;
        let mut loader = factory.create(host)?;

        cancel.check()?;
        info!(project = %full.display(), "loading project");
        let info = loader.load(&full)?;
        cancel.check()?;

        let id = key.project_id();
        let references = info.project_references.clone();
        let snapshot = build_snapshot(id, info);
        self.entries.insert(
            key.clone(),
            Entry {
                snapshot: Arc::new(snapshot),
                references: Vec::new(),
                state: LoadState::Loading,
            },
        );
        self.by_id.insert(id, key.clone());
        self.order.push(key.clone());
        inserted.push(key.clone());

        let base = full.parent().unwrap_or(Path::new(""));
        let mut resolved = Vec::new();
        for reference in &references {
            cancel.check()?;
            let reference_path = if reference.is_absolute() {
                reference.clone()
            } else {
                base.join(reference)
            };
            let reference_key = self.resolve(host, &reference_path, cancel, inserted)?;
            let reference_id = reference_key.project_id();
            if !resolved.contains(&reference_id) {
                resolved.push(reference_id);
            }
        }

        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| SnapError::Internal(format!("{} vanished while resolving references", key)))?;
        entry.references = resolved;
        entry.state = LoadState::Registered;
        debug!(project = %full.display(), references = entry.references.len(), "project registered");

        Ok(key)
    }

    fn rollback(&mut self, inserted: &[PathKey]) {
        for key in inserted {
            if let Some(entry) = self.entries.remove(key) {
                self.by_id.remove(&entry.snapshot.id);
            }
        }
        self.order.retain(|key| !inserted.contains(key));
    }

    pub fn project(&self, id: ProjectId) -> Option<Project> {
        let key = self.by_id.get(&id)?;
        self.entries.get(key).map(Entry::handle)
    }

    /// Cached project for `path`, without loading anything
    pub fn find_by_path(&self, path: &Path) -> Option<Project> {
        let full = paths::absolute(path).ok()?;
        self.entries.get(&PathKey::new(&full)).map(Entry::handle)
    }

    /// Every cached project, in the order loading started
    pub fn projects(&self) -> Vec<Project> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .map(Entry::handle)
            .collect()
    }

    pub fn documents_of(&self, id: ProjectId) -> Option<&[DocumentSnapshot]> {
        let key = self.by_id.get(&id)?;
        self.entries.get(key).map(|e| e.snapshot.documents.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release the loader factory and everything cached
    pub fn dispose(mut self) {
        self.release_factory();
    }

    fn release_factory(&mut self) {
        if let Some(mut factory) = self.factory.take() {
            debug!("disposing loader factory");
            factory.dispose();
        }
    }
}

impl Drop for SnapshotWorkspace {
    fn drop(&mut self) {
        self.release_factory();
    }
}

fn build_snapshot(id: ProjectId, info: ProjectInfo) -> ProjectSnapshot {
    let documents = info.documents.into_iter().map(|d| read_document(id, d)).collect();
    let additional_documents = info
        .additional_documents
        .into_iter()
        .map(|d| read_document(id, d))
        .collect();

    ProjectSnapshot {
        id,
        name: info.name,
        assembly_name: info.assembly_name,
        language: info.language,
        file_path: info.file_path,
        output_file_path: info.output_file_path,
        compilation_options: info.compilation_options,
        documents,
        additional_documents,
        metadata_references: info.metadata_references,
    }
}

fn read_document(project: ProjectId, doc: DocumentInfo) -> DocumentSnapshot {
    let text: Arc<str> = match std::fs::read(&doc.file_path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into(),
        Err(e) => {
            warn!(document = %doc.file_path.display(), "document unreadable, using empty text: {}", e);
            Arc::from("")
        }
    };
    let path_key = PathKey::new(&doc.file_path);

    DocumentSnapshot {
        id: DocumentId::new(project, path_key.as_str()),
        name: doc
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_path: doc.file_path,
        folders: doc.folders,
        text,
    }
}
