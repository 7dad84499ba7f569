mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Command};
use libprojsnap_core::SnapError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting the CLI log filter
const LOG_ENV: &str = "PROJSNAP_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = run_command(&cli) {
        output::output_error(&cli, &e);
        std::process::exit(e.exit_code());
    }
}

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(cli.log_level.as_deref().unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_command(cli: &Cli) -> Result<(), SnapError> {
    match &cli.command {
        Command::Load {
            input,
            in_process,
            reader,
        } => commands::load::run(cli, input, *in_process, reader.as_deref()),
        Command::Read { input } => commands::read::run(cli, input),
    }
}
