//! Built-in evaluator for a small subset of MSBuild project files
//!
//! Handles `PropertyGroup`/`ItemGroup` with conditions, `$(Property)`
//! expansion, wildcard includes and the handful of item types the snapshot
//! needs. Imports and targets are not followed.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use super::{condition, language_for, resolve_against, EvaluationError, ProjectEvaluator};
use crate::paths::{normalize_lexically, PathKey};
use crate::types::{
    CompilationOptions, DocumentInfo, GlobalProperties, OutputKind, Platform, ProjectInfo,
};
use crate::xml::XmlElement;

/// Configuration used for output paths when the project sets none
pub const DEFAULT_CONFIGURATION: &str = "Debug";

const ADDITIONAL_FILES_ITEM: &str = "AdditionalFiles";

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectFileEvaluator;

impl ProjectFileEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl ProjectEvaluator for ProjectFileEvaluator {
    fn evaluate(&self, path: &Path, globals: &GlobalProperties) -> Result<ProjectInfo, EvaluationError> {
        let text = std::fs::read_to_string(path)?;
        let root = XmlElement::parse(&text)?;
        if root.name != "Project" {
            return Err(EvaluationError::Unsupported(format!(
                "root element <{}>, expected <Project>",
                root.name
            )));
        }

        let mut scope = Scope::new(path, globals);
        scope.evaluate_properties(&root)?;
        let items = scope.evaluate_items(&root)?;
        Ok(scope.into_project(items))
    }
}

#[derive(Debug, Default)]
struct Items {
    documents: Vec<DocumentInfo>,
    additional_documents: Vec<DocumentInfo>,
    project_references: Vec<PathBuf>,
    metadata_references: Vec<PathBuf>,
}

/// Property state for one evaluation
struct Scope<'a> {
    path: PathBuf,
    dir: PathBuf,
    globals: &'a GlobalProperties,
    properties: GlobalProperties,
}

impl<'a> Scope<'a> {
    fn new(path: &Path, globals: &'a GlobalProperties) -> Self {
        let path = normalize_lexically(path);
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = file_stem(&path);
        let dir_str = with_trailing_separator(&dir);

        let mut properties = GlobalProperties::new();
        properties.set("MSBuildProjectFullPath", path.to_string_lossy());
        properties.set("MSBuildProjectDirectory", dir.to_string_lossy());
        properties.set("MSBuildThisFileDirectory", dir_str);
        properties.set("MSBuildProjectName", stem.as_str());
        properties.set(
            "MSBuildProjectFile",
            path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
        );

        Self {
            path,
            dir,
            globals,
            properties,
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.globals.get(name).or_else(|| self.properties.get(name))
    }

    /// Global properties cannot be overridden from inside the project
    fn set(&mut self, name: &str, value: String) {
        if self.globals.contains(name) {
            debug!(property = name, "ignoring project assignment to global property");
            return;
        }
        self.properties.set(name, value);
    }

    fn expand(&self, input: &str) -> String {
        property_pattern()
            .replace_all(input, |caps: &regex::Captures<'_>| {
                self.get(&caps[1]).unwrap_or_default().to_string()
            })
            .into_owned()
    }

    fn condition(&self, element: &XmlElement) -> Result<bool, EvaluationError> {
        match element.attr("Condition") {
            Some(cond) => condition::evaluate(cond, &self.dir, &|s| self.expand(s)),
            None => Ok(true),
        }
    }

    fn evaluate_properties(&mut self, root: &XmlElement) -> Result<(), EvaluationError> {
        for group in root.children_named("PropertyGroup") {
            if !self.condition(group)? {
                continue;
            }
            for property in &group.children {
                if !self.condition(property)? {
                    continue;
                }
                let value = self.expand(&property.text);
                self.set(&property.name, value);
            }
        }
        Ok(())
    }

    fn evaluate_items(&self, root: &XmlElement) -> Result<Items, EvaluationError> {
        let additional_names: Vec<String> = self
            .get("AdditionalFileItemNames")
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let is_additional = |name: &str| {
            name.eq_ignore_ascii_case(ADDITIONAL_FILES_ITEM)
                || additional_names.iter().any(|n| n.eq_ignore_ascii_case(name))
        };

        let mut items = Items::default();
        for group in root.children_named("ItemGroup") {
            if !self.condition(group)? {
                continue;
            }
            for item in &group.children {
                let Some(include) = item.attr("Include") else {
                    continue;
                };
                if !self.condition(item)? {
                    continue;
                }

                let kind = item.name.as_str();
                for file in self.expand_include(include)? {
                    if kind.eq_ignore_ascii_case("Compile") {
                        items.documents.push(self.document(item, file));
                    } else if kind.eq_ignore_ascii_case("ProjectReference") {
                        if file.is_file() {
                            items.project_references.push(file);
                        } else {
                            warn!(reference = %file.display(), "dropping project reference that does not exist");
                        }
                    } else if kind.eq_ignore_ascii_case("Reference") {
                        if let Some(hint) = self.metadata(item, "HintPath") {
                            let hint = normalize_lexically(&resolve_against(&self.dir, &hint));
                            if hint.is_file() {
                                items.metadata_references.push(hint);
                            } else {
                                debug!(hint = %hint.display(), "reference hint path does not exist");
                            }
                        }
                    } else if is_additional(kind) {
                        items.additional_documents.push(self.document(item, file));
                    }
                }
            }
        }
        Ok(items)
    }

    /// Metadata from a child element or, SDK style, an attribute
    fn metadata(&self, item: &XmlElement, name: &str) -> Option<String> {
        item.child(name)
            .map(|c| c.text.as_str())
            .or_else(|| item.attr(name))
            .map(|value| self.expand(value))
            .filter(|value| !value.trim().is_empty())
    }

    fn expand_include(&self, include: &str) -> Result<Vec<PathBuf>, EvaluationError> {
        let expanded = self.expand(include);
        let mut files = Vec::new();

        for spec in expanded.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let resolved = normalize_lexically(&resolve_against(&self.dir, spec));
            if !spec.contains(['*', '?']) {
                files.push(resolved);
                continue;
            }

            let pattern = resolved.to_string_lossy().into_owned();
            let entries = glob::glob(&pattern).map_err(|e| EvaluationError::Pattern {
                pattern: spec.to_string(),
                message: e.to_string(),
            })?;
            let mut matched = Vec::new();
            for entry in entries {
                match entry {
                    Ok(path) if path.is_file() => matched.push(path),
                    Ok(_) => {}
                    Err(e) => warn!(pattern = %spec, "skipping unreadable glob entry: {}", e),
                }
            }
            matched.sort();
            files.extend(matched);
        }
        Ok(files)
    }

    fn document(&self, item: &XmlElement, file: PathBuf) -> DocumentInfo {
        let folders = match self.metadata(item, "Link") {
            Some(link) => folder_segments(Path::new(&link.replace('\\', "/"))),
            None => match file.strip_prefix(&self.dir) {
                Ok(relative) => folder_segments(relative),
                Err(_) => Vec::new(),
            },
        };
        DocumentInfo::new(file, folders)
    }

    fn into_project(self, items: Items) -> ProjectInfo {
        let name = file_stem(&self.path);
        let configuration = self
            .get("Configuration")
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CONFIGURATION)
            .to_string();

        let output_kind = match self.get("OutputType").filter(|v| !v.is_empty()) {
            Some(value) => OutputKind::from_output_type(value).unwrap_or_else(|| {
                warn!(project = %self.path.display(), output_type = value, "unknown OutputType, assuming Library");
                OutputKind::DynamicallyLinkedLibrary
            }),
            None => OutputKind::DynamicallyLinkedLibrary,
        };

        let prefer_32bit = self
            .get("Prefer32Bit")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let target = self
            .get("PlatformTarget")
            .filter(|v| !v.is_empty())
            .or_else(|| self.get("Platform"))
            .unwrap_or_default();
        let platform = Platform::from_platform_target(target, prefer_32bit).unwrap_or_else(|| {
            warn!(project = %self.path.display(), platform = target, "unknown platform target, assuming AnyCpu");
            Platform::AnyCpu
        });

        let assembly_name = self
            .get("AssemblyName")
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| name.clone());

        let output_dir = match self.get("OutputPath").filter(|v| !v.is_empty()) {
            Some(output_path) => resolve_against(&self.dir, output_path),
            None => self.dir.join("bin").join(&configuration),
        };
        let output_file_path = normalize_lexically(
            &output_dir.join(format!("{}.{}", assembly_name, output_kind.extension())),
        );

        ProjectInfo {
            id: PathKey::new(&self.path).project_id(),
            name,
            assembly_name,
            language: language_for(&self.path).to_string(),
            file_path: self.path.clone(),
            output_file_path,
            compilation_options: CompilationOptions {
                output_kind,
                platform,
            },
            project_references: items.project_references,
            metadata_references: items.metadata_references,
            documents: items.documents,
            additional_documents: items.additional_documents,
        }
    }
}

fn property_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\(\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\)").expect("property pattern is valid")
    })
}

fn folder_segments(relative: &Path) -> Vec<String> {
    relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn with_trailing_separator(dir: &Path) -> String {
    let mut s = dir.to_string_lossy().into_owned();
    if !s.ends_with(std::path::MAIN_SEPARATOR) {
        s.push(std::path::MAIN_SEPARATOR);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const LIBRARY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="14.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <Configuration Condition=" '$(Configuration)' == '' ">Debug</Configuration>
    <Platform Condition=" '$(Platform)' == '' ">AnyCPU</Platform>
    <OutputType>Library</OutputType>
    <AssemblyName>Contoso.$(MSBuildProjectName)</AssemblyName>
    <AdditionalFileItemNames>None</AdditionalFileItemNames>
  </PropertyGroup>
  <PropertyGroup Condition=" '$(Configuration)|$(Platform)' == 'Debug|AnyCPU' ">
    <OutputPath>bin\Debug\</OutputPath>
  </PropertyGroup>
  <PropertyGroup Condition=" '$(Configuration)|$(Platform)' == 'Release|AnyCPU' ">
    <OutputPath>bin\Release\</OutputPath>
  </PropertyGroup>
  <ItemGroup>
    <Compile Include="Class1.cs" />
    <Compile Include="Properties\AssemblyInfo.cs" />
    <Compile Include="Release.cs" Condition=" '$(Configuration)' == 'Release' " />
    <None Include="Text\Notes.txt" />
    <Reference Include="Vendor">
      <HintPath>lib\Vendor.dll</HintPath>
    </Reference>
    <ProjectReference Include="..\Core\Core.csproj" />
  </ItemGroup>
</Project>"#;

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let project_dir = dir.path().join("Lib");
        fs::create_dir_all(project_dir.join("Properties")).unwrap();
        fs::create_dir_all(project_dir.join("Text")).unwrap();
        fs::create_dir_all(project_dir.join("lib")).unwrap();
        fs::write(project_dir.join("lib").join("Vendor.dll"), b"MZ").unwrap();
        fs::create_dir_all(dir.path().join("Core")).unwrap();
        fs::write(dir.path().join("Core").join("Core.csproj"), "<Project />").unwrap();
        let path = project_dir.join("Lib.csproj");
        fs::write(&path, LIBRARY).unwrap();
        (dir, path)
    }

    fn names(docs: &[DocumentInfo]) -> Vec<String> {
        docs.iter()
            .map(|d| d.file_path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_default_configuration_is_debug() {
        let (_dir, path) = setup();
        let project = ProjectFileEvaluator.evaluate(&path, &GlobalProperties::new()).unwrap();

        assert_eq!(project.name, "Lib");
        assert_eq!(project.assembly_name, "Contoso.Lib");
        assert_eq!(project.language, "C#");
        assert!(project.output_file_path.ends_with("bin/Debug/Contoso.Lib.dll"));
        assert_eq!(names(&project.documents), vec!["Class1.cs", "AssemblyInfo.cs"]);
        assert_eq!(project.documents[1].folders, vec!["Properties"]);
        assert_eq!(names(&project.additional_documents), vec!["Notes.txt"]);
        assert_eq!(project.metadata_references.len(), 1);
    }

    #[test]
    fn test_global_configuration_wins() {
        let (_dir, path) = setup();
        let globals: GlobalProperties = [("Configuration", "Release")].into_iter().collect();
        let project = ProjectFileEvaluator.evaluate(&path, &globals).unwrap();

        assert!(project.output_file_path.ends_with("bin/Release/Contoso.Lib.dll"));
        assert!(names(&project.documents).contains(&"Release.cs".to_string()));
    }

    #[test]
    fn test_project_reference_resolved_against_project_dir() {
        let (dir, path) = setup();
        let project = ProjectFileEvaluator.evaluate(&path, &GlobalProperties::new()).unwrap();
        assert_eq!(
            project.project_references,
            vec![dir.path().join("Core").join("Core.csproj")]
        );
    }

    #[test]
    fn test_missing_project_reference_is_dropped() {
        let (dir, path) = setup();
        fs::remove_file(dir.path().join("Core").join("Core.csproj")).unwrap();
        let project = ProjectFileEvaluator.evaluate(&path, &GlobalProperties::new()).unwrap();
        assert!(project.project_references.is_empty());
        assert_eq!(names(&project.documents), vec!["Class1.cs", "AssemblyInfo.cs"]);
    }

    #[test]
    fn test_item_types_ignore_case() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Core")).unwrap();
        fs::write(dir.path().join("Core").join("Core.csproj"), "<Project />").unwrap();
        fs::write(dir.path().join("A.cs"), "").unwrap();
        let path = dir.path().join("App.csproj");
        fs::write(
            &path,
            r#"<Project>
  <ItemGroup>
    <compile Include="A.cs" />
    <additionalfiles Include="stylecop.json" />
    <projectreference Include="Core\Core.csproj" />
  </ItemGroup>
</Project>"#,
        )
        .unwrap();

        let project = ProjectFileEvaluator.evaluate(&path, &GlobalProperties::new()).unwrap();
        assert_eq!(names(&project.documents), vec!["A.cs"]);
        assert_eq!(names(&project.additional_documents), vec!["stylecop.json"]);
        assert_eq!(project.project_references, vec![dir.path().join("Core").join("Core.csproj")]);
    }

    #[test]
    fn test_wildcard_include_and_link() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src").join("nested")).unwrap();
        fs::write(dir.path().join("src").join("A.cs"), "").unwrap();
        fs::write(dir.path().join("src").join("nested").join("B.cs"), "").unwrap();
        fs::write(dir.path().join("src").join("skip.txt"), "").unwrap();
        let path = dir.path().join("App.csproj");
        fs::write(
            &path,
            r#"<Project>
  <PropertyGroup><OutputType>Exe</OutputType><PlatformTarget>x64</PlatformTarget></PropertyGroup>
  <ItemGroup>
    <Compile Include="src\**\*.cs" />
    <Compile Include="..\Shared\Shared.cs" Link="Linked\Shared.cs" />
  </ItemGroup>
</Project>"#,
        )
        .unwrap();

        let project = ProjectFileEvaluator.evaluate(&path, &GlobalProperties::new()).unwrap();
        assert_eq!(names(&project.documents), vec!["A.cs", "B.cs", "Shared.cs"]);
        assert_eq!(project.documents[1].folders, vec!["src", "nested"]);
        assert_eq!(project.documents[2].folders, vec!["Linked"]);
        assert_eq!(project.compilation_options.output_kind, OutputKind::ConsoleApplication);
        assert_eq!(project.compilation_options.platform, Platform::X64);
        assert!(project.output_file_path.ends_with("bin/Debug/App.exe"));
    }

    #[test]
    fn test_bad_condition_is_evaluation_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Bad.csproj");
        fs::write(
            &path,
            r#"<Project><PropertyGroup Condition="'$(X)' == "><A>1</A></PropertyGroup></Project>"#,
        )
        .unwrap();
        let err = ProjectFileEvaluator.evaluate(&path, &GlobalProperties::new()).unwrap_err();
        assert!(matches!(err, EvaluationError::Condition { .. }));
    }

    #[test]
    fn test_non_project_root_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("NotAProject.csproj");
        fs::write(&path, "<Solution />").unwrap();
        let err = ProjectFileEvaluator.evaluate(&path, &GlobalProperties::new()).unwrap_err();
        assert!(matches!(err, EvaluationError::Unsupported(_)));
    }
}
