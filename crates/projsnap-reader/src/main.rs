//! projsnap-reader - evaluates one project file in its own process
//!
//! Reads a context document from stdin (or takes a project path argument),
//! evaluates the project and writes its snapshot XML to stdout. Anything on
//! stderr is treated as failure by the caller, so diagnostics stay off unless
//! PROJSNAP_READER_LOG is set.

mod error;

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use libprojsnap_core::evaluation::CommandFallback;
use libprojsnap_core::{GlobalProperties, ProjectReader, ReaderOutput};
use libprojsnap_ipc::{ContextDocument, READER_LOG_ENV};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use error::ReaderError;

#[derive(Parser)]
#[command(name = "projsnap-reader", about = "Evaluate a project file and print its snapshot", version)]
struct Cli {
    /// Project file to read with empty global properties; without it the
    /// context document is read from stdin
    project: Option<PathBuf>,

    /// Write the snapshot to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// One word of the command resolving metadata references when evaluation
    /// finds none (repeat for each word)
    #[arg(long = "fallback-command", value_name = "WORD", allow_hyphen_values = true)]
    fallback_command: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let Ok(filter) = EnvFilter::try_from_env(READER_LOG_ENV) else {
        return;
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<(), ReaderError> {
    let context = match &cli.project {
        Some(project) => ContextDocument::new(project, GlobalProperties::new()),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            ContextDocument::parse(&input)?
        }
    };
    debug!(
        project = %context.project_file.display(),
        properties = context.properties.len(),
        "reader context"
    );

    let mut reader = ProjectReader::default();
    if let Some(fallback) = CommandFallback::from_command_line(&cli.fallback_command) {
        reader = reader.with_fallback(Box::new(fallback));
    }

    let xml = reader.read_xml(&context.project_file, &context.properties)?;
    let output = match &cli.output {
        Some(path) => ReaderOutput::File(path.clone()),
        None => ReaderOutput::Stdout,
    };
    output.deliver(&xml)?;
    Ok(())
}
