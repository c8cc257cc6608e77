//! CLI implementation for the `s7sim export` subcommand.
//!
//! Flattens the DB tree into the tabular CSV form, one row per field.
//! Combine with the global `--output` flag to write a file.

use std::io::Write;

use crate::s7::config::Config;
use crate::s7::files::export_csv;
use crate::SimError;

/// Options for the `s7sim export` subcommand.
pub struct ExportOptions {
    /// Path to the YAML configuration file.
    pub config: String,
}

/// Execute the export subcommand.
pub fn execute(opts: &ExportOptions, writer: &mut dyn Write) -> Result<(), SimError> {
    let config = Config::load(&opts.config)?;
    export_csv(&config, writer)
}
