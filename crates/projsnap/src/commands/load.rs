use std::path::Path;
use std::sync::Arc;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use libprojsnap_core::config::Isolation;
use libprojsnap_core::evaluation::ProjectFileEvaluator;
use libprojsnap_core::workspace::LoadState;
use libprojsnap_core::{
    InProcessLoaderFactory, LoaderFactory, Project, SnapError, SnapshotWorkspace, StandaloneHost,
};
use libprojsnap_ipc::ProcessLoaderFactory;
use serde::Serialize;
use tracing::debug;

use super::{fallback, global_properties, resolve_config};
use crate::cli::{Cli, ProjectArgs};
use crate::output::output_success;

#[derive(Serialize)]
struct ProjectOutput {
    id: String,
    name: String,
    assembly_name: String,
    language: String,
    file_path: String,
    output_file_path: String,
    output_kind: String,
    platform: String,
    documents: usize,
    additional_documents: usize,
    metadata_references: usize,
    project_references: Vec<String>,
    state: LoadState,
}

impl From<&Project> for ProjectOutput {
    fn from(project: &Project) -> Self {
        let snapshot = project.snapshot();
        Self {
            id: project.id().to_string(),
            name: snapshot.name.clone(),
            assembly_name: snapshot.assembly_name.clone(),
            language: snapshot.language.clone(),
            file_path: snapshot.file_path.display().to_string(),
            output_file_path: snapshot.output_file_path.display().to_string(),
            output_kind: snapshot.compilation_options.output_kind.to_string(),
            platform: snapshot.compilation_options.platform.to_string(),
            documents: snapshot.documents.len(),
            additional_documents: snapshot.additional_documents.len(),
            metadata_references: snapshot.metadata_references.len(),
            project_references: project.project_references().iter().map(|id| id.to_string()).collect(),
            state: project.state(),
        }
    }
}

#[derive(Serialize)]
struct LoadOutput {
    root: String,
    projects: Vec<ProjectOutput>,
}

pub fn run(cli: &Cli, input: &ProjectArgs, in_process: bool, reader: Option<&Path>) -> Result<(), SnapError> {
    let config = resolve_config(cli)?;
    let properties = global_properties(&config, input)?;

    let factory: Box<dyn LoaderFactory> = if in_process || config.isolation == Isolation::InProcess {
        let evaluator = Arc::new(ProjectFileEvaluator::new());
        let factory = match fallback(&config) {
            Some(fallback) => InProcessLoaderFactory::with_fallback(evaluator, Box::new(fallback)),
            None => InProcessLoaderFactory::new(evaluator),
        };
        Box::new(factory)
    } else {
        let configured = reader.or(config.reader_path.as_deref());
        let factory = ProcessLoaderFactory::discover(configured)
            .map_err(|e| e.into_snap_error(&input.project))?
            .with_fallback_command(config.fallback_command.clone());
        debug!(reader = %factory.reader().display(), "using process isolation");
        Box::new(factory)
    };

    let host = StandaloneHost::new(&properties);
    let mut workspace = SnapshotWorkspace::new(factory);
    let root = workspace.get_or_add(&host, &input.project)?;

    let output = LoadOutput {
        root: root.id().to_string(),
        projects: workspace.projects().iter().map(ProjectOutput::from).collect(),
    };
    workspace.dispose();

    output_success(cli, output, render_table);
    Ok(())
}

fn render_table(output: &LoadOutput) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Name", "Kind", "Platform", "Docs", "Refs", "Output"]);
    for project in &output.projects {
        table.add_row(vec![
            project.name.clone(),
            project.output_kind.clone(),
            project.platform.clone(),
            project.documents.to_string(),
            project.project_references.len().to_string(),
            project.output_file_path.clone(),
        ]);
    }
    format!("{}\n{} project(s) loaded", table, output.projects.len())
}
