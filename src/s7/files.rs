//! Configuration file I/O: hierarchical YAML and flat CSV export.
//!
//! YAML is the native configuration form (see [`crate::s7::config`]).
//! The CSV export flattens the DB tree into one row per field:
//!
//! ```text
//! db_number,name,type,offset,bit,value
//! 1,Running,BOOL,0,0,false
//! 1,Speed,INT,4,,1500
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::s7::config::Config;
use crate::s7::value::Value;
use crate::SimError;

impl Config {
    /// Load and validate a YAML configuration file (`.yaml` / `.yml`).
    pub fn load(path: impl AsRef<Path>) -> Result<Config, SimError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SimError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        Config::from_yaml_str(&text)
    }

    /// Save the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let path = path.as_ref();
        let text = serde_yaml::to_string(self)
            .map_err(|e| SimError::Io(format!("cannot serialize config: {}", e)))?;
        fs::write(path, text)
            .map_err(|e| SimError::Io(format!("cannot write {}: {}", path.display(), e)))
    }
}

/// Write the flat tabular form: a header row plus one row per field.
pub fn export_csv(config: &Config, writer: &mut dyn Write) -> Result<(), SimError> {
    let io_err = |e: std::io::Error| SimError::Io(e.to_string());
    writeln!(writer, "db_number,name,type,offset,bit,value").map_err(io_err)?;
    for db in &config.dbs {
        for field in &db.fields {
            let bit = field.bit.map(|b| b.to_string()).unwrap_or_default();
            let value = field
                .value
                .as_ref()
                .map(csv_escape)
                .unwrap_or_default();
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                db.db_number,
                csv_escape(&Value::Str(field.name.clone())),
                field.ty,
                field.offset,
                bit,
                value
            )
            .map_err(io_err)?;
        }
    }
    Ok(())
}

/// RFC 4180 CSV escaping for a field value.
pub fn csv_escape(val: &Value) -> String {
    match val {
        Value::Str(s) => {
            if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.clone()
            }
        }
        other => other.to_string(),
    }
}
