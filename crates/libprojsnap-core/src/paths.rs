//! Path normalization and cache keys

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::SnapError;
use crate::types::ProjectId;

/// Make `path` absolute against the current directory and drop `.`/`..`
/// segments lexically
pub fn absolute(path: &Path) -> Result<PathBuf, SnapError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize_lexically(&joined))
}

/// Resolve `.` and `..` without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Case-insensitive cache key for a normalized absolute project path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    pub fn new(normalized: &Path) -> Self {
        Self(normalized.to_string_lossy().replace('\\', "/").to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn project_id(&self) -> ProjectId {
        ProjectId::from_path_key(&self.0)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a requested project path and check that it exists
pub fn resolve_project_path(path: &Path) -> Result<(PathBuf, PathKey), SnapError> {
    let full = absolute(path)?;
    if !full.is_file() {
        return Err(SnapError::NotFound(full));
    }
    let key = PathKey::new(&full);
    Ok((full, key))
}
