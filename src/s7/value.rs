//! Runtime value domain for DB fields.
//!
//! [`Value`] is the type that flows between the configuration, the script
//! engine, the codec, and the inspector boundary. It is serde-untagged so
//! YAML scalars (`true`, `42`, `3.14`, `"text"`) map onto it directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::s7::types::S7Type;
use crate::SimError;

/// A typed runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
}

/// Comparison operator of a `WAIT_UNTIL` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CmpOp {
    /// Parse one of `== != > < >= <=`.
    pub fn parse(s: &str) -> Option<CmpOp> {
        match s {
            "==" => Some(CmpOp::Eq),
            "!=" => Some(CmpOp::Ne),
            ">" => Some(CmpOp::Gt),
            "<" => Some(CmpOp::Lt),
            ">=" => Some(CmpOp::Ge),
            "<=" => Some(CmpOp::Le),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
        }
    }
}

impl Value {
    /// Parse a script or config literal according to the target field type.
    ///
    /// Booleans accept `true/1/yes` and `false/0/no` (case-insensitive);
    /// the integer family parses decimal integers; `REAL` parses floats;
    /// everything else (strings, DT, DTL) keeps the text with one level of
    /// surrounding single or double quotes stripped.
    pub fn parse_literal(text: &str, ty: &S7Type) -> Result<Value, SimError> {
        let text = text.trim();
        match ty {
            S7Type::Bool => parse_bool_text(text)
                .map(Value::Bool)
                .ok_or_else(|| SimError::InvalidValue(format!("not a BOOL literal: {}", text))),
            t if t.is_integer() => text
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| SimError::InvalidValue(format!("not an integer literal: {}", text))),
            S7Type::Real => text
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|_| SimError::InvalidValue(format!("not a REAL literal: {}", text))),
            _ => Ok(Value::Str(strip_quotes(text).to_string())),
        }
    }

    /// Coerce to a boolean per the BOOL truthiness table.
    pub fn as_bool(&self) -> Result<bool, SimError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(n) => Ok(*n != 0),
            Value::Str(s) => parse_bool_text(s)
                .ok_or_else(|| SimError::InvalidValue(format!("not a BOOL value: {}", s))),
            Value::Real(_) => Err(SimError::InvalidValue(
                "REAL value is not a BOOL".to_string(),
            )),
        }
    }

    /// Coerce to a signed 64-bit integer (strings parse as decimal).
    pub fn as_i64(&self) -> Result<i64, SimError> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Bool(b) => Ok(*b as i64),
            Value::Real(r) => Ok(*r as i64),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| SimError::InvalidValue(format!("not an integer: {}", s))),
        }
    }

    /// Coerce to a float (strings parse as decimal floats).
    pub fn as_f64(&self) -> Result<f64, SimError> {
        match self {
            Value::Real(r) => Ok(*r),
            Value::Int(n) => Ok(*n as f64),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| SimError::InvalidValue(format!("not a number: {}", s))),
        }
    }

    /// Textual form used when packing string-family fields.
    pub fn as_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Real(r) => Some(*r),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Str(_) => None,
        }
    }

    /// Compare two values under a `WAIT_UNTIL` operator.
    ///
    /// Numerics (BOOL counts as 0/1) compare numerically, strings compare
    /// lexicographically. A mixed string/numeric comparison is never true.
    pub fn compare(&self, op: CmpOp, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_numeric(), other.as_numeric()) {
            return match op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Gt => a > b,
                CmpOp::Lt => a < b,
                CmpOp::Ge => a >= b,
                CmpOp::Le => a <= b,
            };
        }
        if let (Value::Str(a), Value::Str(b)) = (self, other) {
            return match op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Gt => a > b,
                CmpOp::Lt => a < b,
                CmpOp::Ge => a >= b,
                CmpOp::Le => a <= b,
            };
        }
        false
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Real(r) => {
                if r.is_finite() && r.fract() == 0.0 {
                    write!(f, "{:.1}", r)
                } else {
                    write!(f, "{}", r)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

fn parse_bool_text(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 {
        let bytes = s.as_bytes();
        if (bytes[0] == b'"' && bytes[s.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[s.len() - 1] == b'\'')
        {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal_bool() {
        assert_eq!(
            Value::parse_literal("TRUE", &S7Type::Bool).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            Value::parse_literal("no", &S7Type::Bool).unwrap(),
            Value::Bool(false)
        );
        assert!(Value::parse_literal("maybe", &S7Type::Bool).is_err());
    }

    #[test]
    fn test_parse_literal_numeric() {
        assert_eq!(
            Value::parse_literal("-42", &S7Type::Int).unwrap(),
            Value::Int(-42)
        );
        assert_eq!(
            Value::parse_literal("3.5", &S7Type::Real).unwrap(),
            Value::Real(3.5)
        );
        assert!(Value::parse_literal("3.5", &S7Type::Int).is_err());
    }

    #[test]
    fn test_parse_literal_strips_quotes() {
        assert_eq!(
            Value::parse_literal("\"hello world\"", &S7Type::String(16)).unwrap(),
            Value::Str("hello world".to_string())
        );
        assert_eq!(
            Value::parse_literal("'x'", &S7Type::WString(4)).unwrap(),
            Value::Str("x".to_string())
        );
        assert_eq!(
            Value::parse_literal("plain", &S7Type::String(16)).unwrap(),
            Value::Str("plain".to_string())
        );
    }

    #[test]
    fn test_compare_numeric() {
        assert!(Value::Int(5).compare(CmpOp::Gt, &Value::Int(3)));
        assert!(Value::Real(2.5).compare(CmpOp::Le, &Value::Int(3)));
        assert!(Value::Bool(true).compare(CmpOp::Eq, &Value::Int(1)));
        assert!(!Value::Int(5).compare(CmpOp::Ne, &Value::Real(5.0)));
    }

    #[test]
    fn test_compare_strings() {
        let a = Value::Str("abc".to_string());
        let b = Value::Str("abd".to_string());
        assert!(a.compare(CmpOp::Lt, &b));
        assert!(a.compare(CmpOp::Ne, &b));
    }

    #[test]
    fn test_compare_mixed_is_false() {
        let s = Value::Str("5".to_string());
        assert!(!s.compare(CmpOp::Eq, &Value::Int(5)));
        assert!(!Value::Int(5).compare(CmpOp::Gt, &s));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(-7).to_string(), "-7");
        assert_eq!(Value::Real(3.14).to_string(), "3.14");
        assert_eq!(Value::Real(2.0).to_string(), "2.0");
        assert_eq!(Value::Str("hi".to_string()).to_string(), "hi");
    }

    #[test]
    fn test_yaml_untagged_mapping() {
        assert_eq!(
            serde_yaml::from_str::<Value>("true").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(serde_yaml::from_str::<Value>("42").unwrap(), Value::Int(42));
        assert_eq!(
            serde_yaml::from_str::<Value>("2.5").unwrap(),
            Value::Real(2.5)
        );
        assert_eq!(
            serde_yaml::from_str::<Value>("\"text\"").unwrap(),
            Value::Str("text".to_string())
        );
    }
}
