//! The main entry point: build the calculator and write every requested
//! output table next to the settings file.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use thermoelast_compute::{Base, Calculator};

use crate::writer::ResultsWriter;

pub fn execute(settings: &Path) -> Result<()> {
    let calculator = Calculator::from_config_file(settings)?;
    let out_dir = settings.parent().unwrap_or_else(|| Path::new("."));

    let writer = ResultsWriter::new(&calculator);
    let output = &calculator.config().output;
    for entry in &output.volume_base {
        writer.write(Base::Volume, entry, out_dir)?;
    }
    for entry in &output.pressure_base {
        writer.write(Base::Pressure, entry, out_dir)?;
    }
    info!(
        volume_base = output.volume_base.len(),
        pressure_base = output.pressure_base.len(),
        "calculation finished"
    );
    Ok(())
}
