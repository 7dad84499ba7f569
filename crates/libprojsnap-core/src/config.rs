use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SnapError;
use crate::types::GlobalProperties;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "projsnap.toml";

/// How projects are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Isolation {
    /// Spawn `projsnap-reader` for every project
    #[default]
    Process,
    /// Evaluate in the calling process
    InProcess,
}

/// Settings stored in projsnap.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapConfig {
    #[serde(default)]
    pub isolation: Isolation,
    /// Explicit path to the reader executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader_path: Option<PathBuf>,
    /// Command run to resolve metadata references when evaluation finds none
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_command: Vec<String>,
    /// Global properties applied to every load
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl SnapConfig {
    pub fn global_properties(&self) -> GlobalProperties {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }
}

/// Load config from `path`
pub fn load_config(path: &Path) -> Result<SnapConfig, SnapError> {
    let content = std::fs::read_to_string(path)?;
    let config: SnapConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load projsnap.toml from `dir` if present
pub fn load_default_config(dir: &Path) -> Result<Option<SnapConfig>, SnapError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    load_config(&path).map(Some)
}

pub fn save_config(path: &Path, config: &SnapConfig) -> Result<(), SnapError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let config = SnapConfig {
            isolation: Isolation::InProcess,
            reader_path: Some(PathBuf::from("/opt/projsnap/projsnap-reader")),
            fallback_command: vec!["msbuild".to_string(), "-t:ResolveAssemblyReferences".to_string()],
            properties: [("Configuration".to_string(), "Release".to_string())].into_iter().collect(),
        };

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();

        let config = load_default_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.isolation, Isolation::Process);
        assert!(config.reader_path.is_none());
        assert!(config.global_properties().is_empty());
    }

    #[test]
    fn test_missing_default_config() {
        let dir = tempdir().unwrap();
        assert!(load_default_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_isolation_names() {
        let config: SnapConfig = toml::from_str("isolation = \"in-process\"\n[properties]\nPlatform = \"x64\"\n").unwrap();
        assert_eq!(config.isolation, Isolation::InProcess);
        assert_eq!(config.global_properties().get("platform"), Some("x64"));

        let err = toml::from_str::<SnapConfig>("isolation = \"appdomain\"").unwrap_err();
        assert!(err.to_string().contains("appdomain"));
    }
}
