use libprojsnap_core::{ProjectReader, SnapError};
use serde::Serialize;

use super::{fallback, global_properties, resolve_config};
use crate::cli::{Cli, ProjectArgs};
use crate::output::output_success;

#[derive(Serialize)]
struct ReadOutput {
    xml: String,
}

pub fn run(cli: &Cli, input: &ProjectArgs) -> Result<(), SnapError> {
    let config = resolve_config(cli)?;
    let properties = global_properties(&config, input)?;

    let mut reader = ProjectReader::default();
    if let Some(fallback) = fallback(&config) {
        reader = reader.with_fallback(Box::new(fallback));
    }

    let xml = reader.read_xml(&input.project, &properties)?;
    output_success(cli, ReadOutput { xml }, |out| out.xml.trim_end().to_string());
    Ok(())
}
