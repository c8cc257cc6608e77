//! CLI implementation for the `s7sim validate` subcommand.
//!
//! Runs the configuration validator and reports either a summary of the
//! accepted layout or the first violation with its tree path.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::wprintln;
use crate::s7::config::Config;
use crate::s7::store::DbMemory;
use crate::SimError;

/// Options for the `s7sim validate` subcommand.
pub struct ValidateOptions {
    /// Path to the YAML configuration file.
    pub config: String,
    /// Emit output as JSON.
    pub json: bool,
}

#[derive(Serialize)]
struct ValidationReport {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    db_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_count: Option<usize>,
}

/// Execute the validate subcommand.
pub fn execute(opts: &ValidateOptions, writer: &mut dyn Write) -> Result<(), SimError> {
    // I/O and YAML syntax problems are real errors, not verdicts
    let verdict = match Config::load(&opts.config) {
        Ok(config) => Ok(config),
        Err(SimError::InvalidConfig { path, reason }) => Err((path, reason)),
        Err(e) => return Err(e),
    };

    let report = match &verdict {
        Ok(config) => ValidationReport {
            file: opts.config.clone(),
            valid: true,
            path: None,
            reason: None,
            db_count: Some(config.dbs.len()),
            field_count: Some(config.dbs.iter().map(|d| d.fields.len()).sum()),
        },
        Err((path, reason)) => ValidationReport {
            file: opts.config.clone(),
            valid: false,
            path: Some(path.clone()),
            reason: Some(reason.clone()),
            db_count: None,
            field_count: None,
        },
    };

    if opts.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| SimError::Io(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    if let Ok(config) = &verdict {
        wprintln!(writer, "{}: {}", opts.config, "OK".green().bold())?;
        for db in &config.dbs {
            wprintln!(
                writer,
                "  DB {} ({} fields, {} bytes)",
                db.db_number,
                db.fields.len(),
                DbMemory::size_of(&db.fields)
            )?;
        }
    } else {
        wprintln!(writer, "{}: {}", opts.config, "INVALID".red().bold())?;
        wprintln!(
            writer,
            "  at {}: {}",
            report.path.as_deref().unwrap_or("?"),
            report.reason.as_deref().unwrap_or("?")
        )?;
    }
    Ok(())
}
