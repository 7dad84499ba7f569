//! Context document written to a reader's stdin
//!
//! ```text
//! <Context>
//!   <Property Name="ProjectFile">/work/App/App.csproj</Property>
//!   <Property Name="Configuration">Release</Property>
//! </Context>
//! ```

use std::path::PathBuf;

use libprojsnap_core::types::GlobalProperties;
use libprojsnap_core::xml::XmlElement;

use crate::error::IpcError;

const ROOT: &str = "Context";
const PROPERTY: &str = "Property";
const PROJECT_FILE: &str = "ProjectFile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocument {
    pub project_file: PathBuf,
    pub properties: GlobalProperties,
}

impl ContextDocument {
    pub fn new(project_file: impl Into<PathBuf>, properties: GlobalProperties) -> Self {
        Self {
            project_file: project_file.into(),
            properties,
        }
    }

    pub fn to_xml(&self) -> String {
        let project = XmlElement::new(PROPERTY)
            .with_attr("Name", PROJECT_FILE)
            .with_text(self.project_file.to_string_lossy());
        let properties = self
            .properties
            .iter()
            .map(|(name, value)| XmlElement::new(PROPERTY).with_attr("Name", name).with_text(value));

        XmlElement::new(ROOT)
            .with_child(project)
            .with_children(properties)
            .to_xml_string()
    }

    pub fn parse(input: &str) -> Result<Self, IpcError> {
        let root = XmlElement::parse(input)?;
        if root.name != ROOT {
            return Err(IpcError::Context(format!("expected <{}> root, found <{}>", ROOT, root.name)));
        }

        let mut project_file = None;
        let mut properties = GlobalProperties::new();
        for property in root.children_named(PROPERTY) {
            let name = property
                .attr("Name")
                .map(str::trim)
                .ok_or_else(|| IpcError::Context("<Property> without Name".to_string()))?;
            let value = property.text.trim();
            if name.eq_ignore_ascii_case(PROJECT_FILE) {
                project_file = Some(PathBuf::from(value));
            } else {
                properties.set(name, value);
            }
        }

        let project_file = project_file
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| IpcError::Context("no ProjectFile property".to_string()))?;
        Ok(Self {
            project_file,
            properties,
        })
    }
}
