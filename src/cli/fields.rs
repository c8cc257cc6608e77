//! CLI implementation for the `s7sim fields` subcommand.
//!
//! Prints every DB's field layout: name, type, offset, bit, and the
//! configured initial value, plus the computed buffer size per DB.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::wprintln;
use crate::s7::config::Config;
use crate::s7::store::DbMemory;
use crate::SimError;

/// Options for the `s7sim fields` subcommand.
pub struct FieldsOptions {
    /// Path to the YAML configuration file.
    pub config: String,
    /// Emit output as JSON.
    pub json: bool,
}

#[derive(Serialize)]
struct DbReport {
    db_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    size: usize,
    fields: Vec<FieldReport>,
}

#[derive(Serialize)]
struct FieldReport {
    name: String,
    #[serde(rename = "type")]
    type_tag: String,
    offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

/// Execute the fields subcommand.
pub fn execute(opts: &FieldsOptions, writer: &mut dyn Write) -> Result<(), SimError> {
    let config = Config::load(&opts.config)?;

    if opts.json {
        let report: Vec<DbReport> = config
            .dbs
            .iter()
            .map(|db| DbReport {
                db_number: db.db_number,
                name: db.name.clone(),
                size: DbMemory::size_of(&db.fields),
                fields: db
                    .fields
                    .iter()
                    .map(|f| FieldReport {
                        name: f.name.clone(),
                        type_tag: f.ty.to_string(),
                        offset: f.offset,
                        bit: f.bit,
                        value: f.value.as_ref().map(|v| v.to_string()),
                    })
                    .collect(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| SimError::Io(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    for db in &config.dbs {
        let title = match &db.name {
            Some(name) => format!("DB {} ({})", db.db_number, name),
            None => format!("DB {}", db.db_number),
        };
        wprintln!(
            writer,
            "{} - {} bytes",
            title.cyan().bold(),
            DbMemory::size_of(&db.fields)
        )?;
        wprintln!(
            writer,
            "  {:<20} {:<14} {:>8} {:>4}  {}",
            "NAME",
            "TYPE",
            "OFFSET",
            "BIT",
            "VALUE"
        )?;
        for field in &db.fields {
            wprintln!(
                writer,
                "  {:<20} {:<14} {:>8} {:>4}  {}",
                field.name,
                field.ty.to_string(),
                field.offset,
                field.bit.map(|b| b.to_string()).unwrap_or_default(),
                field.value.as_ref().map(|v| v.to_string()).unwrap_or_default()
            )?;
        }
    }
    Ok(())
}
