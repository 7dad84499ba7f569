//! Integration tests for the projsnap-reader executable

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use libprojsnap_core::loader::ProjectLoader;
use libprojsnap_core::protocol::read_project;
use libprojsnap_core::types::SOLUTION_CONFIGURATION_PROPERTY;
use libprojsnap_core::workspace::LoadState;
use libprojsnap_core::{GlobalProperties, LoaderFactory, SnapError, SnapshotWorkspace, StandaloneHost};
use libprojsnap_ipc::{ContextDocument, ProcessLoader, ProcessLoaderFactory};
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

const LIBRARY: &str = r#"<Project>
  <PropertyGroup>
    <Configuration Condition=" '$(Configuration)' == '' ">Debug</Configuration>
    <OutputType>Library</OutputType>
  </PropertyGroup>
  <ItemGroup>
    <Compile Include="Class1.cs" />
    <Compile Include="Release.cs" Condition=" '$(Configuration)' == 'Release' " />
  </ItemGroup>
</Project>"#;

fn reader_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_projsnap-reader"))
}

fn reader() -> Command {
    Command::cargo_bin("projsnap-reader").unwrap()
}

fn library() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let project_dir = dir.path().join("Lib");
    std::fs::create_dir_all(&project_dir).unwrap();
    std::fs::write(project_dir.join("Class1.cs"), "class Class1 {}").unwrap();
    let path = project_dir.join("Lib.csproj");
    std::fs::write(&path, LIBRARY).unwrap();
    (dir, path)
}

fn file_names(paths: impl Iterator<Item = PathBuf>) -> Vec<String> {
    paths
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_positional_project_uses_default_configuration() {
    let (_dir, path) = library();

    let output = reader().arg(&path).assert().success().stderr("").get_output().stdout.clone();
    let project = read_project(&String::from_utf8(output).unwrap()).unwrap();

    assert_eq!(project.name, "Lib");
    assert!(project.output_file_path.ends_with("bin/Debug/Lib.dll"));
    assert_eq!(
        file_names(project.documents.into_iter().map(|d| d.file_path)),
        vec!["Class1.cs"]
    );
}

#[test]
fn test_context_from_stdin() {
    let (_dir, path) = library();
    let properties: GlobalProperties = [("Configuration", "Release")].into_iter().collect();
    let context = ContextDocument::new(&path, properties).to_xml();

    let output = reader()
        .write_stdin(context)
        .assert()
        .success()
        .stderr("")
        .get_output()
        .stdout
        .clone();
    let project = read_project(&String::from_utf8(output).unwrap()).unwrap();

    assert!(project.output_file_path.ends_with("bin/Release/Lib.dll"));
    assert_eq!(
        file_names(project.documents.into_iter().map(|d| d.file_path)),
        vec!["Class1.cs", "Release.cs"]
    );
}

#[test]
fn test_output_flag_writes_file() {
    let (dir, path) = library();
    let out = dir.path().join("snapshot.xml");

    reader()
        .arg(&path)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout("");

    let project = read_project(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(project.assembly_name, "Lib");
}

#[test]
fn test_missing_project_fails_with_detail_on_stderr() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("Missing.csproj");

    reader()
        .arg(&missing)
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("project file not found"));
}

#[test]
fn test_malformed_context_fails() {
    reader()
        .write_stdin("<Context><Property Name=\"Configuration\">Debug</Property></Context>")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ProjectFile"));
}

#[test]
fn test_process_loader_end_to_end() {
    let (_dir, path) = library();
    let contents = format!(
        r#"<SolutionConfiguration><ProjectConfiguration AbsolutePath="{}">Release|AnyCPU</ProjectConfiguration></SolutionConfiguration>"#,
        path.display()
    );
    let properties: GlobalProperties = [(SOLUTION_CONFIGURATION_PROPERTY, contents)].into_iter().collect();

    let mut loader = ProcessLoader::new(reader_path(), properties);
    let project = loader.load(&path).unwrap();
    assert!(project.output_file_path.ends_with("bin/Release/Lib.dll"));

    assert!(matches!(loader.load(&path), Err(SnapError::LoaderReused)));
}

#[test]
fn test_process_loader_surfaces_reader_error() {
    let dir = tempdir().unwrap();
    let broken = dir.path().join("Broken.csproj");
    std::fs::write(&broken, "<Project><ItemGroup></Project>").unwrap();

    let err = ProcessLoader::new(reader_path(), GlobalProperties::new())
        .load(&broken)
        .unwrap_err();
    match err {
        SnapError::Transport { path, message } => {
            assert_eq!(path, broken);
            assert!(message.contains("failed to evaluate"), "{message}");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

fn write_project(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_workspace_over_process_isolation() {
    let dir = tempdir().unwrap();
    write_project(
        dir.path(),
        "B/B.csproj",
        r#"<Project><ItemGroup><ProjectReference Include="..\A\A.csproj" /></ItemGroup></Project>"#,
    );
    let a = write_project(
        dir.path(),
        "A/A.csproj",
        r#"<Project><ItemGroup><ProjectReference Include="..\B\B.csproj" /></ItemGroup></Project>"#,
    );

    let factory: Box<dyn LoaderFactory> = Box::new(ProcessLoaderFactory::new(reader_path()));
    let mut workspace = SnapshotWorkspace::new(factory);
    let host = StandaloneHost::default();

    let project_a = workspace.get_or_add(&host, &a).unwrap();
    assert_eq!(workspace.len(), 2);
    let project_b = workspace.project(project_a.project_references()[0]).unwrap();
    assert_eq!(project_b.name(), "B");
    assert_eq!(project_b.project_references(), &[project_a.id()]);
    assert_eq!(project_b.state(), LoadState::Registered);
}
