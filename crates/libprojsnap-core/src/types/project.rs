use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::ProjectId;

/// Kind of output a project compiles to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputKind {
    ConsoleApplication,
    WindowsApplication,
    #[default]
    DynamicallyLinkedLibrary,
    NetModule,
    WindowsRuntimeMetadata,
    WindowsRuntimeApplication,
}

impl OutputKind {
    /// Canonical name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::ConsoleApplication => "ConsoleApplication",
            OutputKind::WindowsApplication => "WindowsApplication",
            OutputKind::DynamicallyLinkedLibrary => "DynamicallyLinkedLibrary",
            OutputKind::NetModule => "NetModule",
            OutputKind::WindowsRuntimeMetadata => "WindowsRuntimeMetadata",
            OutputKind::WindowsRuntimeApplication => "WindowsRuntimeApplication",
        }
    }

    /// Map an `OutputType` project property value
    pub fn from_output_type(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "exe" => Some(OutputKind::ConsoleApplication),
            "winexe" => Some(OutputKind::WindowsApplication),
            "library" => Some(OutputKind::DynamicallyLinkedLibrary),
            "module" => Some(OutputKind::NetModule),
            "winmdobj" => Some(OutputKind::WindowsRuntimeMetadata),
            "appcontainerexe" => Some(OutputKind::WindowsRuntimeApplication),
            _ => None,
        }
    }

    /// File extension of the primary output
    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::ConsoleApplication
            | OutputKind::WindowsApplication
            | OutputKind::WindowsRuntimeApplication => "exe",
            OutputKind::DynamicallyLinkedLibrary => "dll",
            OutputKind::NetModule => "netmodule",
            OutputKind::WindowsRuntimeMetadata => "winmdobj",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ConsoleApplication" => Ok(OutputKind::ConsoleApplication),
            "WindowsApplication" => Ok(OutputKind::WindowsApplication),
            "DynamicallyLinkedLibrary" => Ok(OutputKind::DynamicallyLinkedLibrary),
            "NetModule" => Ok(OutputKind::NetModule),
            "WindowsRuntimeMetadata" => Ok(OutputKind::WindowsRuntimeMetadata),
            "WindowsRuntimeApplication" => Ok(OutputKind::WindowsRuntimeApplication),
            other => Err(format!("unknown output kind '{}'", other)),
        }
    }
}

/// Target platform of the compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    AnyCpu,
    AnyCpu32BitPreferred,
    X86,
    X64,
    Itanium,
    Arm,
    Arm64,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::AnyCpu => "AnyCpu",
            Platform::AnyCpu32BitPreferred => "AnyCpu32BitPreferred",
            Platform::X86 => "X86",
            Platform::X64 => "X64",
            Platform::Itanium => "Itanium",
            Platform::Arm => "Arm",
            Platform::Arm64 => "Arm64",
        }
    }

    /// Map a `PlatformTarget` project property value
    pub fn from_platform_target(value: &str, prefer_32bit: bool) -> Option<Self> {
        let platform = match value.to_ascii_lowercase().as_str() {
            "" | "anycpu" | "any cpu" => Platform::AnyCpu,
            "x86" => Platform::X86,
            "x64" => Platform::X64,
            "itanium" => Platform::Itanium,
            "arm" => Platform::Arm,
            "arm64" => Platform::Arm64,
            _ => return None,
        };
        if platform == Platform::AnyCpu && prefer_32bit {
            return Some(Platform::AnyCpu32BitPreferred);
        }
        Some(platform)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AnyCpu" => Ok(Platform::AnyCpu),
            "AnyCpu32BitPreferred" => Ok(Platform::AnyCpu32BitPreferred),
            "X86" => Ok(Platform::X86),
            "X64" => Ok(Platform::X64),
            "Itanium" => Ok(Platform::Itanium),
            "Arm" => Ok(Platform::Arm),
            "Arm64" => Ok(Platform::Arm64),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompilationOptions {
    pub output_kind: OutputKind,
    pub platform: Platform,
}

/// A document as reported by evaluation: a path and its logical folders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub file_path: PathBuf,
    pub folders: Vec<String>,
}

impl DocumentInfo {
    pub fn new(file_path: impl Into<PathBuf>, folders: Vec<String>) -> Self {
        Self {
            file_path: file_path.into(),
            folders,
        }
    }
}

/// The evaluated shape of one project, as it crosses the isolation boundary
///
/// Project references are file paths: ids are re-derived by whoever
/// receives this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: ProjectId,
    pub name: String,
    pub assembly_name: String,
    pub language: String,
    pub file_path: PathBuf,
    pub output_file_path: PathBuf,
    pub compilation_options: CompilationOptions,
    pub project_references: Vec<PathBuf>,
    pub metadata_references: Vec<PathBuf>,
    pub documents: Vec<DocumentInfo>,
    pub additional_documents: Vec<DocumentInfo>,
}
