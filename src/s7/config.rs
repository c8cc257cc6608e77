//! Configuration model and tree validator.
//!
//! A configuration describes the simulated PLC's Data Blocks:
//!
//! ```yaml
//! dbs:
//!   - db_number: 1
//!     name: Motor
//!     fields:
//!       - { name: Running, type: BOOL, offset: 0, bit: 0, value: false }
//!       - { name: Speed, type: INT, offset: 4, value: 1500 }
//! ```
//!
//! [`validate`] is a pure first-error check over the *parsed tree* (not the
//! typed model), so a malformed file is reported with the path of the
//! offending node (`dbs[1].fields[0].value`) instead of a serde error.
//! [`Config::from_yaml_str`] validates and then deserializes.

use serde::{Deserialize, Serialize};
use serde_yaml::Value as Yaml;

use crate::s7::codec;
use crate::s7::types::S7Type;
use crate::s7::value::Value;
use crate::SimError;

/// One typed slot inside a DB, at an explicit byte offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: S7Type,
    pub offset: u32,
    /// Bit index 0..=7, meaningful for bit-addressed BOOL fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit: Option<u8>,
    /// Initial value applied at simulator construction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A numbered Data Block definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbDef {
    pub db_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fields: Vec<FieldDef>,
}

impl DbDef {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A full simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dbs: Vec<DbDef>,
}

impl Config {
    /// Parse and validate a YAML configuration document.
    pub fn from_yaml_str(text: &str) -> Result<Config, SimError> {
        let tree: Yaml = serde_yaml::from_str(text)
            .map_err(|e| SimError::Io(format!("cannot parse YAML: {}", e)))?;
        validate(&tree)?;
        serde_yaml::from_value(tree).map_err(|e| SimError::InvalidConfig {
            path: "dbs".to_string(),
            reason: e.to_string(),
        })
    }

    /// Look up a DB definition by number.
    pub fn db(&self, db_number: u32) -> Option<&DbDef> {
        self.dbs.iter().find(|d| d.db_number == db_number)
    }
}

fn fail(path: String, reason: impl Into<String>) -> SimError {
    SimError::InvalidConfig {
        path,
        reason: reason.into(),
    }
}

/// Validate a parsed configuration tree, reporting the first violation.
///
/// Checks, in order: root shape, per-DB required keys and `db_number`
/// uniqueness, per-field required keys, field-name uniqueness within a DB,
/// offset and bit ranges, the type-tag grammar, and initial-value
/// compatibility with the declared type.
pub fn validate(tree: &Yaml) -> Result<(), SimError> {
    let root = tree
        .as_mapping()
        .ok_or_else(|| fail("(root)".to_string(), "root must be a mapping"))?;
    let dbs = root
        .get("dbs")
        .and_then(Yaml::as_sequence)
        .ok_or_else(|| fail("dbs".to_string(), "missing top-level 'dbs' list"))?;

    let mut seen_dbs = Vec::new();
    for (i, db) in dbs.iter().enumerate() {
        let path = format!("dbs[{}]", i);
        let db = db
            .as_mapping()
            .ok_or_else(|| fail(path.clone(), "DB entry must be a mapping"))?;
        let db_number = db
            .get("db_number")
            .ok_or_else(|| fail(path.clone(), "missing 'db_number'"))?
            .as_u64()
            .ok_or_else(|| fail(format!("{}.db_number", path), "must be a non-negative integer"))?;
        if seen_dbs.contains(&db_number) {
            return Err(fail(
                format!("{}.db_number", path),
                format!("duplicate db_number {}", db_number),
            ));
        }
        seen_dbs.push(db_number);
        let fields = db
            .get("fields")
            .ok_or_else(|| fail(path.clone(), "missing 'fields'"))?
            .as_sequence()
            .ok_or_else(|| fail(format!("{}.fields", path), "must be a list"))?;

        let mut seen_names: Vec<&str> = Vec::new();
        for (j, field) in fields.iter().enumerate() {
            let fpath = format!("{}.fields[{}]", path, j);
            validate_field(field, &fpath, &mut seen_names)?;
        }
    }
    Ok(())
}

fn validate_field<'a>(
    field: &'a Yaml,
    path: &str,
    seen_names: &mut Vec<&'a str>,
) -> Result<(), SimError> {
    let field = field
        .as_mapping()
        .ok_or_else(|| fail(path.to_string(), "field must be a mapping"))?;

    let name = field
        .get("name")
        .and_then(Yaml::as_str)
        .ok_or_else(|| fail(path.to_string(), "missing 'name'"))?;
    if name.is_empty() {
        return Err(fail(format!("{}.name", path), "name must not be empty"));
    }
    if seen_names.contains(&name) {
        return Err(fail(
            format!("{}.name", path),
            format!("duplicate field name {}", name),
        ));
    }
    seen_names.push(name);

    let tag = field
        .get("type")
        .and_then(Yaml::as_str)
        .ok_or_else(|| fail(path.to_string(), "missing 'type'"))?;
    let ty: S7Type = tag
        .parse()
        .map_err(|e: SimError| fail(format!("{}.type", path), e.to_string()))?;

    let offset = field
        .get("offset")
        .ok_or_else(|| fail(path.to_string(), "missing 'offset'"))?;
    if offset.as_u64().is_none() {
        return Err(fail(
            format!("{}.offset", path),
            "offset must be a non-negative integer",
        ));
    }

    if let Some(bit) = field.get("bit") {
        match bit.as_u64() {
            Some(b) if b <= 7 => {}
            _ => {
                return Err(fail(
                    format!("{}.bit", path),
                    "bit must be an integer in 0..=7",
                ))
            }
        }
    }

    if let Some(value) = field.get("value") {
        let value = yaml_scalar(value)
            .ok_or_else(|| fail(format!("{}.value", path), "value must be a scalar"))?;
        check_value_compat(&ty, &value)
            .map_err(|reason| fail(format!("{}.value", path), reason))?;
    }
    Ok(())
}

fn yaml_scalar(yaml: &Yaml) -> Option<Value> {
    match yaml {
        Yaml::Bool(b) => Some(Value::Bool(*b)),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else {
                n.as_f64().map(Value::Real)
            }
        }
        Yaml::String(s) => Some(Value::Str(s.clone())),
        _ => None,
    }
}

/// Check that an initial value's literal form is compatible with a type.
///
/// Unlike `codec::pack`, a STRING/WSTRING initial value longer than `n`
/// is rejected here instead of silently truncated: a config declaring an
/// impossible initial value is a config error.
fn check_value_compat(ty: &S7Type, value: &Value) -> Result<(), String> {
    let incompatible = || format!("value {} is not compatible with type {}", value, ty);
    match ty {
        S7Type::Bool => value.as_bool().map(|_| ()).map_err(|_| incompatible()),
        t if t.is_integer() => value.as_i64().map(|_| ()).map_err(|_| incompatible()),
        S7Type::Real => value.as_f64().map(|_| ()).map_err(|_| incompatible()),
        S7Type::Dt => match value {
            Value::Str(s) => codec::parse_dt_text(s.trim())
                .map(|_| ())
                .map_err(|_| incompatible()),
            _ => Err(incompatible()),
        },
        S7Type::Dtl => match value {
            Value::Str(s) => codec::parse_dtl_text(s.trim())
                .map(|_| ())
                .map_err(|_| incompatible()),
            _ => Err(incompatible()),
        },
        S7Type::String(n) | S7Type::WString(n) => match value {
            Value::Str(s) if s.chars().count() <= *n as usize => Ok(()),
            Value::Str(s) => Err(format!(
                "value {} exceeds {} length {}",
                s,
                if matches!(ty, S7Type::String(_)) {
                    "STRING"
                } else {
                    "WSTRING"
                },
                n
            )),
            _ => Err(incompatible()),
        },
        _ => unreachable!("all type variants covered"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"
dbs:
  - db_number: 1
    name: Motor
    fields:
      - { name: Running, type: BOOL, offset: 0, bit: 0, value: false }
      - { name: Speed, type: INT, offset: 4, value: 1500 }
      - { name: Temp, type: REAL, offset: 8, value: 21.5 }
      - { name: Label, type: "STRING[8]", offset: 16, value: BELT }
  - db_number: 7
    fields:
      - { name: Stamp, type: DT, offset: 0, value: "2024-06-15 12:34:56" }
"#;

    fn tree(text: &str) -> Yaml {
        serde_yaml::from_str(text).unwrap()
    }

    fn first_error(text: &str) -> (String, String) {
        match validate(&tree(text)) {
            Err(SimError::InvalidConfig { path, reason }) => (path, reason),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_good_config_parses() {
        let config = Config::from_yaml_str(GOOD).unwrap();
        assert_eq!(config.dbs.len(), 2);
        let db = config.db(1).unwrap();
        assert_eq!(db.name.as_deref(), Some("Motor"));
        assert_eq!(db.field("Speed").unwrap().ty, S7Type::Int);
        assert_eq!(db.field("Speed").unwrap().value, Some(Value::Int(1500)));
        assert_eq!(
            config.db(7).unwrap().field("Stamp").unwrap().ty,
            S7Type::Dt
        );
    }

    #[test]
    fn test_root_must_be_mapping() {
        let (path, _) = first_error("- 1\n- 2\n");
        assert_eq!(path, "(root)");
    }

    #[test]
    fn test_missing_dbs_list() {
        let (path, _) = first_error("foo: bar\n");
        assert_eq!(path, "dbs");
    }

    #[test]
    fn test_missing_db_number() {
        let (path, reason) = first_error("dbs:\n  - fields: []\n");
        assert_eq!(path, "dbs[0]");
        assert!(reason.contains("db_number"));
    }

    #[test]
    fn test_duplicate_db_number() {
        let text = r#"
dbs:
  - db_number: 3
    fields: []
  - db_number: 3
    fields: []
"#;
        let (path, reason) = first_error(text);
        assert_eq!(path, "dbs[1].db_number");
        assert!(reason.contains("duplicate"));
    }

    #[test]
    fn test_field_requires_name_type_offset() {
        let text = "dbs:\n  - db_number: 1\n    fields:\n      - { name: A, type: INT }\n";
        let (path, reason) = first_error(text);
        assert_eq!(path, "dbs[0].fields[0]");
        assert!(reason.contains("offset"));
    }

    #[test]
    fn test_duplicate_field_name() {
        let text = r#"
dbs:
  - db_number: 1
    fields:
      - { name: A, type: INT, offset: 0 }
      - { name: A, type: BYTE, offset: 2 }
"#;
        let (path, reason) = first_error(text);
        assert_eq!(path, "dbs[0].fields[1].name");
        assert!(reason.contains("duplicate"));
    }

    #[test]
    fn test_negative_offset_rejected() {
        let text = "dbs:\n  - db_number: 1\n    fields:\n      - { name: A, type: INT, offset: -2 }\n";
        let (path, _) = first_error(text);
        assert_eq!(path, "dbs[0].fields[0].offset");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let text = "dbs:\n  - db_number: 1\n    fields:\n      - { name: A, type: LWORD, offset: 0 }\n";
        let (path, reason) = first_error(text);
        assert_eq!(path, "dbs[0].fields[0].type");
        assert!(reason.contains("unsupported"));
    }

    #[test]
    fn test_bit_out_of_range() {
        let text =
            "dbs:\n  - db_number: 1\n    fields:\n      - { name: A, type: BOOL, offset: 0, bit: 9 }\n";
        let (path, _) = first_error(text);
        assert_eq!(path, "dbs[0].fields[0].bit");
    }

    #[test]
    fn test_incompatible_values() {
        for (yaml_value, ty) in [
            ("maybe", "BOOL"),
            ("12.5.3", "REAL"),
            ("xyz", "INT"),
            ("2024-13-01 00:00:00", "DT"),
            ("bad", "DTL"),
        ] {
            let text = format!(
                "dbs:\n  - db_number: 1\n    fields:\n      - {{ name: A, type: {}, offset: 0, value: \"{}\" }}\n",
                ty, yaml_value
            );
            let (path, _) = first_error(&text);
            assert_eq!(path, "dbs[0].fields[0].value", "for type {}", ty);
        }
    }

    #[test]
    fn test_overlong_string_value_rejected() {
        let text = "dbs:\n  - db_number: 1\n    fields:\n      - { name: A, type: \"STRING[4]\", offset: 0, value: TOOLONG }\n";
        let (path, reason) = first_error(text);
        assert_eq!(path, "dbs[0].fields[0].value");
        assert!(reason.contains("exceeds"));
    }

    #[test]
    fn test_yaml_roundtrip_preserves_model() {
        let config = Config::from_yaml_str(GOOD).unwrap();
        let dumped = serde_yaml::to_string(&config).unwrap();
        let reparsed = Config::from_yaml_str(&dumped).unwrap();
        assert_eq!(reparsed.dbs.len(), config.dbs.len());
        assert_eq!(
            reparsed.db(1).unwrap().field("Label").unwrap().value,
            Some(Value::Str("BELT".to_string()))
        );
    }
}
