//! Wire format for project snapshots crossing the isolation boundary
//!
//! ```text
//! <Project Id=".." Name=".." AssemblyName=".." Language=".." FilePath=".." OutputFilePath="..">
//!   <CompilationOptions OutputKind="DynamicallyLinkedLibrary" Platform="AnyCpu" />
//!   <ProjectReferences><ProjectReference FilePath=".." /></ProjectReferences>
//!   <MetadataReferences><MetadataReference FilePath=".." /></MetadataReferences>
//!   <Documents><Document FilePath=".." Folders="a/b" /></Documents>
//!   <AdditionalDocuments><Document FilePath=".." Folders="" /></AdditionalDocuments>
//! </Project>
//! ```
//!
//! Enumerations travel as canonical names. Project references travel as file
//! paths because ids are re-derived on the receiving side.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{CompilationOptions, DocumentInfo, OutputKind, Platform, ProjectInfo};
use crate::xml::{XmlElement, XmlError};

/// Separator joining document folder segments on both sides of the wire
pub const FOLDER_SEPARATOR: char = '/';

const ROOT: &str = "Project";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("expected <{expected}> root element, found <{found}>")]
    UnexpectedRoot { expected: &'static str, found: String },

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("<{parent}> is missing required element <{element}>")]
    MissingElement {
        parent: &'static str,
        element: &'static str,
    },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("unreadable snapshot document: {0}")]
    Xml(#[from] XmlError),
}

/// Build the wire tree for a project
pub fn to_xml(project: &ProjectInfo) -> XmlElement {
    XmlElement::new(ROOT)
        .with_attr("Id", project.id.to_string())
        .with_attr("Name", project.name.as_str())
        .with_attr("AssemblyName", project.assembly_name.as_str())
        .with_attr("Language", project.language.as_str())
        .with_attr("FilePath", path_str(&project.file_path))
        .with_attr("OutputFilePath", path_str(&project.output_file_path))
        .with_child(
            XmlElement::new("CompilationOptions")
                .with_attr("OutputKind", project.compilation_options.output_kind.as_str())
                .with_attr("Platform", project.compilation_options.platform.as_str()),
        )
        .with_child(XmlElement::new("ProjectReferences").with_children(
            project.project_references.iter().map(|path| {
                XmlElement::new("ProjectReference").with_attr("FilePath", path_str(path))
            }),
        ))
        .with_child(XmlElement::new("MetadataReferences").with_children(
            project.metadata_references.iter().map(|path| {
                XmlElement::new("MetadataReference").with_attr("FilePath", path_str(path))
            }),
        ))
        .with_child(documents_to_xml("Documents", &project.documents))
        .with_child(documents_to_xml("AdditionalDocuments", &project.additional_documents))
}

/// Serialize a project to wire text
pub fn write_project(project: &ProjectInfo) -> String {
    to_xml(project).to_xml_string()
}

/// Read a project back from its wire tree
pub fn from_xml(root: &XmlElement) -> Result<ProjectInfo, ProtocolError> {
    if root.name != ROOT {
        return Err(ProtocolError::UnexpectedRoot {
            expected: ROOT,
            found: root.name.clone(),
        });
    }

    let id = required(root, "Id")?
        .parse()
        .map_err(|e: crate::types::IdParseError| ProtocolError::InvalidValue {
            field: "Id",
            message: e.to_string(),
        })?;

    let options = required_child(root, "CompilationOptions")?;
    let output_kind: OutputKind = required(options, "OutputKind")?
        .parse()
        .map_err(|message| ProtocolError::InvalidValue {
            field: "OutputKind",
            message,
        })?;
    let platform: Platform = required(options, "Platform")?
        .parse()
        .map_err(|message| ProtocolError::InvalidValue {
            field: "Platform",
            message,
        })?;

    Ok(ProjectInfo {
        id,
        name: required(root, "Name")?.to_string(),
        assembly_name: required(root, "AssemblyName")?.to_string(),
        language: required(root, "Language")?.to_string(),
        file_path: PathBuf::from(required(root, "FilePath")?),
        output_file_path: PathBuf::from(required(root, "OutputFilePath")?),
        compilation_options: CompilationOptions {
            output_kind,
            platform,
        },
        project_references: file_paths(root, "ProjectReferences", "ProjectReference")?,
        metadata_references: file_paths(root, "MetadataReferences", "MetadataReference")?,
        documents: documents_from_xml(root, "Documents")?,
        additional_documents: documents_from_xml(root, "AdditionalDocuments")?,
    })
}

/// Parse wire text into a project
pub fn read_project(input: &str) -> Result<ProjectInfo, ProtocolError> {
    let root = XmlElement::parse(input)?;
    from_xml(&root)
}

/// Split a wire `Folders` value into its segments
pub fn split_folders(value: &str) -> Vec<String> {
    value
        .split(FOLDER_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_folders(folders: &[String]) -> String {
    folders.join(&FOLDER_SEPARATOR.to_string())
}

fn documents_to_xml(name: &str, documents: &[DocumentInfo]) -> XmlElement {
    XmlElement::new(name).with_children(documents.iter().map(|doc| {
        XmlElement::new("Document")
            .with_attr("FilePath", path_str(&doc.file_path))
            .with_attr("Folders", join_folders(&doc.folders))
    }))
}

fn documents_from_xml(root: &XmlElement, list: &'static str) -> Result<Vec<DocumentInfo>, ProtocolError> {
    required_child(root, list)?
        .children_named("Document")
        .map(|doc| {
            Ok(DocumentInfo {
                file_path: PathBuf::from(required(doc, "FilePath")?),
                folders: doc.attr("Folders").map(split_folders).unwrap_or_default(),
            })
        })
        .collect()
}

fn file_paths(
    root: &XmlElement,
    list: &'static str,
    item: &'static str,
) -> Result<Vec<PathBuf>, ProtocolError> {
    required_child(root, list)?
        .children_named(item)
        .map(|element| required(element, "FilePath").map(PathBuf::from))
        .collect()
}

fn required<'a>(element: &'a XmlElement, attribute: &'static str) -> Result<&'a str, ProtocolError> {
    element
        .attr(attribute)
        .ok_or_else(|| ProtocolError::MissingAttribute {
            element: element.name.clone(),
            attribute,
        })
}

fn required_child<'a>(
    element: &'a XmlElement,
    child: &'static str,
) -> Result<&'a XmlElement, ProtocolError> {
    element.child(child).ok_or(ProtocolError::MissingElement {
        parent: ROOT,
        element: child,
    })
}

fn path_str(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}
