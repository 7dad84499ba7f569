pub mod load;
pub mod read;

use libprojsnap_core::config::{load_config, load_default_config, SnapConfig};
use libprojsnap_core::evaluation::CommandFallback;
use libprojsnap_core::types::SOLUTION_CONFIGURATION_PROPERTY;
use libprojsnap_core::{GlobalProperties, SnapError};

use crate::cli::{Cli, ProjectArgs};

/// Config from --config, else projsnap.toml in the working directory, else defaults
pub fn resolve_config(cli: &Cli) -> Result<SnapConfig, SnapError> {
    match &cli.config {
        Some(path) => {
            if !path.is_file() {
                return Err(SnapError::InvalidArgs(format!("config file not found: {}", path.display())));
            }
            load_config(path)
        }
        None => Ok(load_default_config(&std::env::current_dir()?)?.unwrap_or_default()),
    }
}

/// Global properties for a run: config defaults, then -p flags, then the
/// solution configuration document
pub fn global_properties(config: &SnapConfig, input: &ProjectArgs) -> Result<GlobalProperties, SnapError> {
    let mut properties = config.global_properties();
    for (name, value) in &input.properties {
        properties.set(name.as_str(), value.as_str());
    }
    if let Some(path) = &input.solution_config {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SnapError::InvalidArgs(format!("cannot read solution configuration {}: {}", path.display(), e))
        })?;
        properties.set(SOLUTION_CONFIGURATION_PROPERTY, contents);
    }
    Ok(properties)
}

pub fn fallback(config: &SnapConfig) -> Option<CommandFallback> {
    CommandFallback::from_command_line(&config.fallback_command)
}
