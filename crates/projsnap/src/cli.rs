use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "projsnap", about = "Load project graphs into a shared snapshot workspace", version)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress human-readable output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Config file (default: projsnap.toml in the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); PROJSNAP_LOG takes precedence
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a project and everything it references through the workspace
    Load {
        #[command(flatten)]
        input: ProjectArgs,

        /// Evaluate in this process instead of spawning projsnap-reader
        #[arg(long)]
        in_process: bool,

        /// Path to the projsnap-reader executable
        #[arg(long)]
        reader: Option<PathBuf>,
    },

    /// Evaluate one project in-process and print its snapshot XML
    Read {
        #[command(flatten)]
        input: ProjectArgs,
    },
}

#[derive(Args, Clone)]
pub struct ProjectArgs {
    /// Project file
    pub project: PathBuf,

    /// Global property (repeatable)
    #[arg(short = 'p', long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Solution configuration document selecting per-project configurations
    #[arg(long)]
    pub solution_config: Option<PathBuf>,
}

fn parse_property(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", input))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty property name in '{}'", input));
    }
    Ok((key.to_string(), value.to_string()))
}
