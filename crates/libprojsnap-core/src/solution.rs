//! Solution configuration lookup
//!
//! A solution build passes a `CurrentSolutionConfigurationContents` global
//! property that maps each project's absolute path to the
//! `Configuration|Platform` pair selected for it. Nested loads must pick the
//! same pair or their output paths and conditional items drift from what the
//! solution build produces.

use std::path::Path;

use tracing::{debug, warn};

use crate::types::{GlobalProperties, SOLUTION_CONFIGURATION_PROPERTY};
use crate::xml::{XmlElement, XmlError};

/// A `Configuration|Platform` pair selected for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfiguration {
    pub configuration: String,
    pub platform: Option<String>,
}

impl ProjectConfiguration {
    /// Parse `Debug|AnyCPU`; a value without a separator only names a configuration
    pub fn parse(value: &str) -> Self {
        match value.split_once('|') {
            Some((configuration, platform)) => Self {
                configuration: configuration.trim().to_string(),
                platform: Some(platform.trim().to_string()),
            },
            None => Self {
                configuration: value.trim().to_string(),
                platform: None,
            },
        }
    }
}

/// Parsed solution configuration document
#[derive(Debug, Clone)]
pub struct SolutionConfiguration {
    entries: Vec<(String, String)>,
}

impl SolutionConfiguration {
    pub fn parse(contents: &str) -> Result<Self, XmlError> {
        let root = XmlElement::parse(contents)?;
        let mut nodes = root.descendants("ProjectConfiguration");
        if root.name == "ProjectConfiguration" {
            nodes.insert(0, &root);
        }

        let entries = nodes
            .into_iter()
            .filter_map(|node| {
                node.attr("AbsolutePath")
                    .map(|path| (path.to_string(), node.text.clone()))
            })
            .collect();
        Ok(Self { entries })
    }

    /// First entry whose absolute path equals `project_path`, ignoring case
    ///
    /// Matching is on the exact full path string; two spellings of one file
    /// (symlinks, `..` segments) are different entries.
    pub fn lookup(&self, project_path: &Path) -> Option<ProjectConfiguration> {
        let wanted = project_path.to_string_lossy();
        self.entries
            .iter()
            .find(|(path, _)| path.eq_ignore_ascii_case(&wanted))
            .map(|(_, value)| ProjectConfiguration::parse(value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Override `Configuration`/`Platform` in `properties` from the solution
/// configuration document they carry, if it lists `project_path`
///
/// Returns the applied pair, or `None` when the project keeps the
/// evaluator's defaults.
pub fn apply_solution_configuration(
    project_path: &Path,
    properties: &mut GlobalProperties,
) -> Result<Option<ProjectConfiguration>, XmlError> {
    let Some(contents) = properties.get(SOLUTION_CONFIGURATION_PROPERTY) else {
        return Ok(None);
    };

    let solution = SolutionConfiguration::parse(contents)?;
    let Some(selected) = solution.lookup(project_path) else {
        debug!(
            project = %project_path.display(),
            entries = solution.len(),
            "project not listed in solution configuration, using defaults"
        );
        return Ok(None);
    };

    properties.set("Configuration", selected.configuration.as_str());
    match &selected.platform {
        Some(platform) => properties.set("Platform", platform.as_str()),
        None => warn!(
            project = %project_path.display(),
            value = %selected.configuration,
            "solution configuration entry has no platform"
        ),
    }

    debug!(
        project = %project_path.display(),
        configuration = %selected.configuration,
        platform = selected.platform.as_deref().unwrap_or(""),
        "applied solution configuration"
    );
    Ok(Some(selected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents() -> String {
        r#"<CurrentSolutionConfigurationContents xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <SolutionConfiguration xmlns="">
    <ProjectConfiguration Project="{f1db354d-8db4-476c-9308-08cdc0e411f7}" AbsolutePath="/work/CsLibrary/CsLibrary.csproj">Debug|AnyCPU</ProjectConfiguration>
    <ProjectConfiguration Project="{3ede89ec-a461-4e2c-be95-05f63b96926c}" AbsolutePath="/work/PclLibrary/PclLibrary.csproj">Release|x86</ProjectConfiguration>
  </SolutionConfiguration>
</CurrentSolutionConfigurationContents>"#
            .to_string()
    }

    #[test]
    fn test_lookup_ignores_case() {
        let solution = SolutionConfiguration::parse(&contents()).unwrap();
        let config = solution
            .lookup(Path::new("/WORK/pcllibrary/PclLibrary.CSPROJ"))
            .unwrap();
        assert_eq!(config.configuration, "Release");
        assert_eq!(config.platform.as_deref(), Some("x86"));
    }

    #[test]
    fn test_apply_overrides_existing_values() {
        let mut props: GlobalProperties = [
            (SOLUTION_CONFIGURATION_PROPERTY.to_string(), contents()),
            ("Configuration".to_string(), "Debug".to_string()),
        ]
        .into_iter()
        .collect();

        let applied =
            apply_solution_configuration(Path::new("/work/PclLibrary/PclLibrary.csproj"), &mut props)
                .unwrap();

        assert!(applied.is_some());
        assert_eq!(props.get("Configuration"), Some("Release"));
        assert_eq!(props.get("Platform"), Some("x86"));
    }

    #[test]
    fn test_unlisted_project_keeps_properties() {
        let mut props: GlobalProperties =
            [(SOLUTION_CONFIGURATION_PROPERTY.to_string(), contents())]
                .into_iter()
                .collect();

        let applied =
            apply_solution_configuration(Path::new("/work/Other/Other.csproj"), &mut props).unwrap();

        assert!(applied.is_none());
        assert!(!props.contains("Configuration"));
    }

    #[test]
    fn test_no_document_is_noop() {
        let mut props = GlobalProperties::new();
        let applied = apply_solution_configuration(Path::new("/a.csproj"), &mut props).unwrap();
        assert!(applied.is_none());
        assert!(props.is_empty());
    }

    #[test]
    fn test_configuration_without_platform() {
        let parsed = ProjectConfiguration::parse("Release");
        assert_eq!(parsed.configuration, "Release");
        assert_eq!(parsed.platform, None);
    }

    #[test]
    fn test_bare_solution_configuration_root() {
        let doc = r#"<SolutionConfiguration>
<ProjectConfiguration AbsolutePath="/a/A.csproj">Release|AnyCPU</ProjectConfiguration>
</SolutionConfiguration>"#;
        let solution = SolutionConfiguration::parse(doc).unwrap();
        assert_eq!(solution.len(), 1);
    }
}
