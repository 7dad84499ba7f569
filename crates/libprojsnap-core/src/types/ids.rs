use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Namespace for deriving project ids from normalized path keys
const PROJECT_NAMESPACE: Uuid = Uuid::from_u128(0x5f3c_6d0e_8a41_4b7e_9c2d_1e0f_a7b3_c914);

#[derive(Debug, Error)]
#[error("invalid id '{input}': {source}")]
pub struct IdParseError {
    pub input: String,
    #[source]
    pub source: uuid::Error,
}

/// Identity of a project snapshot
///
/// Derived from the normalized path key, so the same project file maps to the
/// same id in every process taking part in one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
    pub fn from_path_key(key: &str) -> Self {
        Self(Uuid::new_v5(&PROJECT_NAMESPACE, key.as_bytes()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ProjectId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ProjectId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim_matches(|c| c == '{' || c == '}'))
            .map(Self)
            .map_err(|source| IdParseError {
                input: s.to_string(),
                source,
            })
    }
}

/// Identity of a document within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new(project: ProjectId, document_path: &str) -> Self {
        Self(Uuid::new_v5(&project.0, document_path.as_bytes()))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
