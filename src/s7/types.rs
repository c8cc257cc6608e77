//! S7 type tags and their byte-size contract.
//!
//! The supported types form a closed set: nine atomic tags plus the two
//! length-parameterized string families. Tags are parsed case-insensitively
//! (`int`, `Int`, and `INT` are the same type) and displayed canonically in
//! uppercase. Each type maps to a fixed byte footprint inside a DB buffer:
//!
//! | Tag | Bytes | Encoding |
//! |-----|-------|----------|
//! | BOOL | 1 | one byte, optionally bit-addressed |
//! | BYTE | 1 | unsigned |
//! | WORD | 2 | big-endian unsigned |
//! | INT | 2 | big-endian two's-complement |
//! | DWORD | 4 | big-endian unsigned |
//! | DINT | 4 | big-endian two's-complement |
//! | REAL | 4 | big-endian IEEE-754 single |
//! | DT | 8 | BCD date-and-time |
//! | DTL | 12 | binary date-and-time |
//! | STRING[n] | n+2 | max-len byte, actual-len byte, ASCII payload |
//! | WSTRING[n] | 2n+4 | max-len u16, actual-len u16, UTF-16BE payload |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::SimError;

/// Largest `n` accepted for `STRING[n]`.
pub const MAX_STRING_LEN: u16 = 254;
/// Largest `n` accepted for `WSTRING[n]`.
pub const MAX_WSTRING_LEN: u16 = 16382;

/// An S7 data type tag.
///
/// The parameterized variants carry their maximum length inline; there is
/// no per-type handler object, just dispatch over this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum S7Type {
    Bool,
    Byte,
    Word,
    Int,
    DWord,
    DInt,
    Real,
    /// DATE_AND_TIME: 8 bytes, BCD-encoded.
    Dt,
    /// DATE_AND_TIME_LONG: 12 bytes, binary-encoded.
    Dtl,
    /// `STRING[n]`, `1 <= n <= 254`: ASCII, one byte per character.
    String(u16),
    /// `WSTRING[n]`, `1 <= n <= 16382`: UTF-16BE, two bytes per code unit.
    WString(u16),
}

impl S7Type {
    /// Byte footprint of this type inside a DB buffer.
    pub fn size(&self) -> usize {
        match self {
            S7Type::Bool | S7Type::Byte => 1,
            S7Type::Word | S7Type::Int => 2,
            S7Type::DWord | S7Type::DInt | S7Type::Real => 4,
            S7Type::Dt => 8,
            S7Type::Dtl => 12,
            S7Type::String(n) => *n as usize + 2,
            S7Type::WString(n) => 2 * *n as usize + 4,
        }
    }

    /// Whether the tag belongs to the integer family (BYTE through DINT).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            S7Type::Byte | S7Type::Word | S7Type::Int | S7Type::DWord | S7Type::DInt
        )
    }

    /// Parse a bracketed length parameter out of `STRING[n]` / `WSTRING[n]`.
    fn parse_len(tag: &str, prefix: &str, max: u16) -> Option<Result<u16, SimError>> {
        let rest = tag.strip_prefix(prefix)?;
        let inner = rest.strip_suffix(']')?;
        let n = match inner.parse::<u32>() {
            Ok(n) => n,
            Err(_) => {
                return Some(Err(SimError::InvalidValue(format!(
                    "invalid length in type {}",
                    tag
                ))))
            }
        };
        if n == 0 || n > max as u32 {
            return Some(Err(SimError::InvalidValue(format!(
                "length {} out of range 1..={} in type {}",
                n, max, tag
            ))));
        }
        Some(Ok(n as u16))
    }
}

impl FromStr for S7Type {
    type Err = SimError;

    fn from_str(tag: &str) -> Result<Self, SimError> {
        let upper = tag.trim().to_uppercase();
        match upper.as_str() {
            "BOOL" => return Ok(S7Type::Bool),
            "BYTE" => return Ok(S7Type::Byte),
            "WORD" => return Ok(S7Type::Word),
            "INT" => return Ok(S7Type::Int),
            "DWORD" => return Ok(S7Type::DWord),
            "DINT" => return Ok(S7Type::DInt),
            "REAL" => return Ok(S7Type::Real),
            "DT" => return Ok(S7Type::Dt),
            "DTL" => return Ok(S7Type::Dtl),
            _ => {}
        }
        if let Some(n) = Self::parse_len(&upper, "STRING[", MAX_STRING_LEN) {
            return n.map(S7Type::String);
        }
        if let Some(n) = Self::parse_len(&upper, "WSTRING[", MAX_WSTRING_LEN) {
            return n.map(S7Type::WString);
        }
        Err(SimError::InvalidValue(format!("unsupported type {}", tag)))
    }
}

impl fmt::Display for S7Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            S7Type::Bool => write!(f, "BOOL"),
            S7Type::Byte => write!(f, "BYTE"),
            S7Type::Word => write!(f, "WORD"),
            S7Type::Int => write!(f, "INT"),
            S7Type::DWord => write!(f, "DWORD"),
            S7Type::DInt => write!(f, "DINT"),
            S7Type::Real => write!(f, "REAL"),
            S7Type::Dt => write!(f, "DT"),
            S7Type::Dtl => write!(f, "DTL"),
            S7Type::String(n) => write!(f, "STRING[{}]", n),
            S7Type::WString(n) => write!(f, "WSTRING[{}]", n),
        }
    }
}

impl Serialize for S7Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for S7Type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}
