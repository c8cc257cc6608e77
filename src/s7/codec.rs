//! Bit-exact pack/unpack for the supported S7 data types.
//!
//! Every type maps to the byte layout a real S7 PLC uses for that type:
//! big-endian integers and IEEE-754 singles, length-prefixed ASCII and
//! UTF-16BE strings, BCD-encoded `DT`, and binary `DTL`. The functions
//! here are pure; the [`store`](crate::s7::store) applies them to DB
//! buffers under its mutex.
//!
//! # Layout summary
//!
//! | Type | pack |
//! |------|------|
//! | BOOL | one byte, `0x00`/`0x01` |
//! | BYTE | low 8 bits of the integer value |
//! | WORD / DWORD | big-endian unsigned 16/32-bit |
//! | INT / DINT | big-endian two's-complement 16/32-bit |
//! | REAL | big-endian IEEE-754 single |
//! | STRING[n] | `[n, k]` + `k` ASCII bytes (input truncated to `n` chars) |
//! | WSTRING[n] | `[n:u16, k:u16]` + `k` UTF-16BE code units |
//! | DT | 8 BCD bytes `[yy, MM, dd, hh, mm, ss, hundredths, weekday<<4]` |
//! | DTL | `[year:u16, month, day, weekday, hour, min, sec, nanos:u32]` |
//!
//! `pack` for the string families emits only the header plus the actual
//! payload; bytes of the field beyond `k` are left untouched by a write.
//! Readers rely on the header length, not on trailing bytes.

use byteorder::{BigEndian, ByteOrder};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::s7::types::S7Type;
use crate::s7::value::Value;
use crate::SimError;

/// Pack a value into the byte layout of the given type.
///
/// Fails with [`SimError::InvalidValue`] when the value does not satisfy
/// the type's textual or range constraints. Over-length STRING/WSTRING
/// input is silently truncated, never an error.
pub fn pack(value: &Value, ty: &S7Type) -> Result<Vec<u8>, SimError> {
    match ty {
        S7Type::Bool => Ok(vec![value.as_bool()? as u8]),
        S7Type::Byte => Ok(vec![(value.as_i64()? & 0xFF) as u8]),
        S7Type::Word => {
            let n = ranged(value.as_i64()?, 0, u16::MAX as i64, "WORD")?;
            let mut buf = [0u8; 2];
            BigEndian::write_u16(&mut buf, n as u16);
            Ok(buf.to_vec())
        }
        S7Type::Int => {
            let n = ranged(value.as_i64()?, i16::MIN as i64, i16::MAX as i64, "INT")?;
            let mut buf = [0u8; 2];
            BigEndian::write_i16(&mut buf, n as i16);
            Ok(buf.to_vec())
        }
        S7Type::DWord => {
            let n = ranged(value.as_i64()?, 0, u32::MAX as i64, "DWORD")?;
            let mut buf = [0u8; 4];
            BigEndian::write_u32(&mut buf, n as u32);
            Ok(buf.to_vec())
        }
        S7Type::DInt => {
            let n = ranged(value.as_i64()?, i32::MIN as i64, i32::MAX as i64, "DINT")?;
            let mut buf = [0u8; 4];
            BigEndian::write_i32(&mut buf, n as i32);
            Ok(buf.to_vec())
        }
        S7Type::Real => {
            let v = value.as_f64()?;
            let f = v as f32;
            if f.is_infinite() && v.is_finite() {
                return Err(SimError::InvalidValue(format!(
                    "value {} does not fit a REAL",
                    v
                )));
            }
            let mut buf = [0u8; 4];
            BigEndian::write_f32(&mut buf, f);
            Ok(buf.to_vec())
        }
        S7Type::String(n) => pack_string(&value.as_text(), *n),
        S7Type::WString(n) => pack_wstring(&value.as_text(), *n),
        S7Type::Dt => pack_dt(value),
        S7Type::Dtl => pack_dtl(value),
    }
}

/// Unpack bytes into a value of the given type.
///
/// Fails with [`SimError::ShortBuffer`] when fewer bytes than the type's
/// size contract are supplied. `REAL` is rounded to two fractional
/// decimals. `DT` sub-second precision is not preserved on read: the
/// hundredths byte written by `pack` is discarded and the canonical form
/// is `YYYY-MM-DD HH:MM:SS`. `DTL` reads back as
/// `YYYY-MM-DD HH:MM:SS.uuuuuu W`.
pub fn unpack(data: &[u8], ty: &S7Type) -> Result<Value, SimError> {
    let needed = ty.size();
    if data.len() < needed {
        return Err(SimError::ShortBuffer {
            needed,
            got: data.len(),
        });
    }
    match ty {
        S7Type::Bool => Ok(Value::Bool(data[0] != 0)),
        S7Type::Byte => Ok(Value::Int(data[0] as i64)),
        S7Type::Word => Ok(Value::Int(BigEndian::read_u16(data) as i64)),
        S7Type::Int => Ok(Value::Int(BigEndian::read_i16(data) as i64)),
        S7Type::DWord => Ok(Value::Int(BigEndian::read_u32(data) as i64)),
        S7Type::DInt => Ok(Value::Int(BigEndian::read_i32(data) as i64)),
        S7Type::Real => {
            let f = BigEndian::read_f32(data) as f64;
            Ok(Value::Real((f * 100.0).round() / 100.0))
        }
        S7Type::String(_) => unpack_string(data),
        S7Type::WString(_) => unpack_wstring(data),
        S7Type::Dt => unpack_dt(data),
        S7Type::Dtl => unpack_dtl(data),
    }
}

fn ranged(n: i64, min: i64, max: i64, tag: &str) -> Result<i64, SimError> {
    if n < min || n > max {
        return Err(SimError::InvalidValue(format!(
            "value {} out of range for {}",
            n, tag
        )));
    }
    Ok(n)
}

// ── STRING / WSTRING ────────────────────────────────────────────────

fn pack_string(text: &str, max_len: u16) -> Result<Vec<u8>, SimError> {
    let truncated: String = text.chars().take(max_len as usize).collect();
    if !truncated.is_ascii() {
        return Err(SimError::InvalidValue(format!(
            "STRING payload is not ASCII: {}",
            truncated
        )));
    }
    let bytes = truncated.as_bytes();
    let mut out = Vec::with_capacity(2 + bytes.len());
    out.push(max_len as u8);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    Ok(out)
}

fn unpack_string(data: &[u8]) -> Result<Value, SimError> {
    let actual = data[1] as usize;
    let end = (2 + actual).min(data.len());
    let payload = &data[2..end];
    if !payload.is_ascii() {
        return Err(SimError::InvalidValue(
            "STRING payload is not ASCII".to_string(),
        ));
    }
    Ok(Value::Str(
        String::from_utf8(payload.to_vec()).expect("ascii checked above"),
    ))
}

fn pack_wstring(text: &str, max_len: u16) -> Result<Vec<u8>, SimError> {
    let truncated: String = text.chars().take(max_len as usize).collect();
    let units: Vec<u16> = truncated.encode_utf16().collect();
    let mut out = Vec::with_capacity(4 + 2 * units.len());
    out.extend_from_slice(&max_len.to_be_bytes());
    out.extend_from_slice(&(units.len() as u16).to_be_bytes());
    for unit in units {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    Ok(out)
}

fn unpack_wstring(data: &[u8]) -> Result<Value, SimError> {
    let actual = BigEndian::read_u16(&data[2..4]) as usize;
    let avail = (data.len() - 4) / 2;
    let count = actual.min(avail);
    let mut units = Vec::with_capacity(count);
    for i in 0..count {
        units.push(BigEndian::read_u16(&data[4 + 2 * i..]));
    }
    String::from_utf16(&units)
        .map(Value::Str)
        .map_err(|_| SimError::InvalidValue("WSTRING payload is not valid UTF-16".to_string()))
}

// ── DT / DTL ────────────────────────────────────────────────────────

fn bcd(v: u32) -> u8 {
    (((v / 10) << 4) | (v % 10)) as u8
}

fn from_bcd(b: u8) -> u32 {
    ((b >> 4) as u32) * 10 + (b & 0x0F) as u32
}

/// Parse `YYYY-MM-DD HH:MM:SS` with an optional `T` separator.
pub(crate) fn parse_dt_text(text: &str) -> Result<NaiveDateTime, SimError> {
    NaiveDateTime::parse_from_str(&text.replace('T', " "), "%Y-%m-%d %H:%M:%S")
        .map_err(|_| SimError::InvalidValue(format!("invalid DT string: {}", text)))
}

fn pack_dt(value: &Value) -> Result<Vec<u8>, SimError> {
    let dt = match value {
        Value::Str(s) => parse_dt_text(s.trim())?,
        other => {
            return Err(SimError::InvalidValue(format!(
                "DT value must be a date-time string, got {}",
                other
            )))
        }
    };
    let hundredths = dt.nanosecond() / 1000 / 10_000;
    let weekday = dt.weekday().number_from_sunday() as u8; // 1=Sunday..7=Saturday
    Ok(vec![
        bcd(dt.year() as u32 % 100),
        bcd(dt.month()),
        bcd(dt.day()),
        bcd(dt.hour()),
        bcd(dt.minute()),
        bcd(dt.second()),
        bcd(hundredths),
        bcd(weekday as u32) << 4,
    ])
}

fn unpack_dt(data: &[u8]) -> Result<Value, SimError> {
    let year = from_bcd(data[0]);
    let year_full = if year < 90 { 2000 + year } else { 1900 + year };
    Ok(Value::Str(format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year_full,
        from_bcd(data[1]),
        from_bcd(data[2]),
        from_bcd(data[3]),
        from_bcd(data[4]),
        from_bcd(data[5]),
    )))
}

/// Parse `YYYY-MM-DD HH:MM:SS[.ffffff] [W]`, returning the date-time and
/// the weekday (explicit, or computed Sunday-based when absent).
pub(crate) fn parse_dtl_text(text: &str) -> Result<(NaiveDateTime, u8), SimError> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    let (date_str, time_str, weekday_str) = match parts.as_slice() {
        [d, t] => (*d, *t, None),
        [d, t, w] => (*d, *t, Some(*w)),
        _ => {
            return Err(SimError::InvalidValue(format!(
                "invalid DTL string: {}",
                text
            )))
        }
    };
    let (time_main, micros) = match time_str.split_once('.') {
        Some((main, frac)) => {
            if frac.len() > 6 || frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(SimError::InvalidValue(format!(
                    "invalid DTL fractional seconds: {}",
                    text
                )));
            }
            let padded = format!("{:0<6}", frac);
            (main, padded.parse::<u32>().expect("digits checked above"))
        }
        None => (time_str, 0),
    };
    let dt = NaiveDateTime::parse_from_str(
        &format!("{} {}", date_str, time_main),
        "%Y-%m-%d %H:%M:%S",
    )
    .map_err(|_| SimError::InvalidValue(format!("invalid DTL string: {}", text)))?;
    let dt = dt
        .with_nanosecond(micros * 1000)
        .expect("microseconds < 1s");
    let weekday = match weekday_str {
        Some(w) => {
            let n: u8 = w
                .parse()
                .map_err(|_| SimError::InvalidValue(format!("invalid DTL weekday: {}", w)))?;
            if !(1..=7).contains(&n) {
                return Err(SimError::InvalidValue(format!(
                    "DTL weekday {} out of range 1..=7",
                    n
                )));
            }
            n
        }
        None => dt.weekday().number_from_sunday() as u8,
    };
    Ok((dt, weekday))
}

fn pack_dtl(value: &Value) -> Result<Vec<u8>, SimError> {
    let (dt, weekday) = match value {
        Value::Str(s) => parse_dtl_text(s.trim())?,
        other => {
            return Err(SimError::InvalidValue(format!(
                "DTL value must be a date-time string, got {}",
                other
            )))
        }
    };
    let mut out = vec![0u8; 12];
    BigEndian::write_u16(&mut out[0..2], dt.year() as u16);
    out[2] = dt.month() as u8;
    out[3] = dt.day() as u8;
    out[4] = weekday;
    out[5] = dt.hour() as u8;
    out[6] = dt.minute() as u8;
    out[7] = dt.second() as u8;
    let nanos = dt.nanosecond() / 1000 * 1000; // microsecond precision
    BigEndian::write_u32(&mut out[8..12], nanos);
    Ok(out)
}

fn unpack_dtl(data: &[u8]) -> Result<Value, SimError> {
    let year = BigEndian::read_u16(&data[0..2]) as i32;
    let (month, day, weekday) = (data[2] as u32, data[3] as u32, data[4]);
    let (hour, minute, second) = (data[5] as u32, data[6] as u32, data[7] as u32);
    let micros = BigEndian::read_u32(&data[8..12]) / 1000;
    let dt = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_micro_opt(hour, minute, second, micros))
        .ok_or_else(|| SimError::InvalidValue("invalid DTL bytes".to_string()))?;
    Ok(Value::Str(format!(
        "{} {}",
        dt.format("%Y-%m-%d %H:%M:%S%.6f"),
        weekday
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_ok(value: Value, ty: &S7Type) -> Vec<u8> {
        pack(&value, ty).unwrap()
    }

    #[test]
    fn test_bool_pack_truthiness() {
        assert_eq!(pack_ok(Value::Bool(true), &S7Type::Bool), [0x01]);
        assert_eq!(pack_ok(Value::Bool(false), &S7Type::Bool), [0x00]);
        assert_eq!(
            pack_ok(Value::Str("yes".to_string()), &S7Type::Bool),
            [0x01]
        );
        assert_eq!(pack_ok(Value::Str("0".to_string()), &S7Type::Bool), [0x00]);
        assert_eq!(pack_ok(Value::Int(1), &S7Type::Bool), [0x01]);
        assert!(pack(&Value::Str("maybe".to_string()), &S7Type::Bool).is_err());
    }

    #[test]
    fn test_byte_masks_without_error() {
        assert_eq!(pack_ok(Value::Int(0x1FF), &S7Type::Byte), [0xFF]);
        assert_eq!(pack_ok(Value::Int(7), &S7Type::Byte), [0x07]);
    }

    #[test]
    fn test_int_known_encoding() {
        // INT -12345 is 0xCFC7 big-endian
        assert_eq!(pack_ok(Value::Int(-12345), &S7Type::Int), [0xCF, 0xC7]);
        assert_eq!(
            unpack(&[0xCF, 0xC7], &S7Type::Int).unwrap(),
            Value::Int(-12345)
        );
    }

    #[test]
    fn test_integer_range_checks() {
        assert!(pack(&Value::Int(0x10000), &S7Type::Word).is_err());
        assert!(pack(&Value::Int(-1), &S7Type::Word).is_err());
        assert!(pack(&Value::Int(32768), &S7Type::Int).is_err());
        assert!(pack(&Value::Int(-32769), &S7Type::Int).is_err());
        assert!(pack(&Value::Int(1 << 32), &S7Type::DWord).is_err());
        assert!(pack(&Value::Int(i32::MAX as i64 + 1), &S7Type::DInt).is_err());
    }

    #[test]
    fn test_unsigned_roundtrips() {
        assert_eq!(
            unpack(&pack_ok(Value::Int(0xFFFF), &S7Type::Word), &S7Type::Word).unwrap(),
            Value::Int(0xFFFF)
        );
        assert_eq!(
            unpack(
                &pack_ok(Value::Int(0xDEADBEEF), &S7Type::DWord),
                &S7Type::DWord
            )
            .unwrap(),
            Value::Int(0xDEADBEEF)
        );
        assert_eq!(
            unpack(
                &pack_ok(Value::Int(-2147483648), &S7Type::DInt),
                &S7Type::DInt
            )
            .unwrap(),
            Value::Int(-2147483648)
        );
    }

    #[test]
    fn test_real_known_encoding() {
        // 3.14f32 is 0x4048F5C3
        assert_eq!(
            pack_ok(Value::Real(3.14), &S7Type::Real),
            [0x40, 0x48, 0xF5, 0xC3]
        );
        assert_eq!(
            unpack(&[0x40, 0x48, 0xF5, 0xC3], &S7Type::Real).unwrap(),
            Value::Real(3.14)
        );
    }

    #[test]
    fn test_real_rounds_to_two_decimals() {
        let bytes = pack_ok(Value::Real(1.2345), &S7Type::Real);
        assert_eq!(unpack(&bytes, &S7Type::Real).unwrap(), Value::Real(1.23));
    }

    #[test]
    fn test_real_signed_zero() {
        let pos = pack_ok(Value::Real(0.0), &S7Type::Real);
        assert_eq!(pos, [0x00, 0x00, 0x00, 0x00]);
        assert_eq!(unpack(&pos, &S7Type::Real).unwrap(), Value::Real(0.0));
        let neg = pack_ok(Value::Real(-0.0), &S7Type::Real);
        assert_eq!(neg, [0x80, 0x00, 0x00, 0x00]);
        // -0.0 == 0.0 in IEEE-754, the canonical read form is equal to zero
        assert_eq!(unpack(&neg, &S7Type::Real).unwrap(), Value::Real(-0.0));
    }

    #[test]
    fn test_real_overflow_rejected() {
        assert!(pack(&Value::Real(1e40), &S7Type::Real).is_err());
    }

    #[test]
    fn test_string_header_and_truncation() {
        // STRING[8] with "HELLO WORLD" stores 08 08 "HELLO WO"
        let bytes = pack_ok(Value::Str("HELLO WORLD".to_string()), &S7Type::String(8));
        assert_eq!(bytes[0], 0x08);
        assert_eq!(bytes[1], 0x08);
        assert_eq!(&bytes[2..], b"HELLO WO");
        assert_eq!(
            unpack(&bytes, &S7Type::String(8)).unwrap(),
            Value::Str("HELLO WO".to_string())
        );
    }

    #[test]
    fn test_string_short_payload_length() {
        let bytes = pack_ok(Value::Str("AB".to_string()), &S7Type::String(8));
        // header + 2 payload bytes only; trailing field bytes are not cleared
        assert_eq!(bytes, [0x08, 0x02, b'A', b'B']);
        let mut field = vec![0u8; S7Type::String(8).size()];
        field[..bytes.len()].copy_from_slice(&bytes);
        assert_eq!(
            unpack(&field, &S7Type::String(8)).unwrap(),
            Value::Str("AB".to_string())
        );
    }

    #[test]
    fn test_string_rejects_non_ascii() {
        assert!(pack(&Value::Str("héllo".to_string()), &S7Type::String(8)).is_err());
    }

    #[test]
    fn test_wstring_non_ascii_roundtrip() {
        let ty = S7Type::WString(16);
        let text = "Grüße 漢字";
        let bytes = pack_ok(Value::Str(text.to_string()), &ty);
        assert_eq!(&bytes[0..2], &16u16.to_be_bytes());
        assert_eq!(&bytes[2..4], &(text.chars().count() as u16).to_be_bytes());
        let mut field = vec![0u8; ty.size()];
        field[..bytes.len()].copy_from_slice(&bytes);
        assert_eq!(unpack(&field, &ty).unwrap(), Value::Str(text.to_string()));
    }

    #[test]
    fn test_wstring_truncates_to_max_chars() {
        let ty = S7Type::WString(3);
        let bytes = pack_ok(Value::Str("abcdef".to_string()), &ty);
        assert_eq!(&bytes[2..4], &3u16.to_be_bytes());
        let mut field = vec![0u8; ty.size()];
        field[..bytes.len()].copy_from_slice(&bytes);
        assert_eq!(unpack(&field, &ty).unwrap(), Value::Str("abc".to_string()));
    }

    #[test]
    fn test_dt_known_encoding() {
        // 2024-06-15 is a Saturday: Sunday-based weekday 7, BCD high nibble
        let bytes = pack_ok(
            Value::Str("2024-06-15 12:34:56".to_string()),
            &S7Type::Dt,
        );
        assert_eq!(bytes, [0x24, 0x06, 0x15, 0x12, 0x34, 0x56, 0x00, 0x70]);
        assert_eq!(
            unpack(&bytes, &S7Type::Dt).unwrap(),
            Value::Str("2024-06-15 12:34:56".to_string())
        );
    }

    #[test]
    fn test_dt_accepts_t_separator() {
        let a = pack_ok(Value::Str("2024-06-15T12:34:56".to_string()), &S7Type::Dt);
        let b = pack_ok(Value::Str("2024-06-15 12:34:56".to_string()), &S7Type::Dt);
        assert_eq!(a, b);
    }

    #[test]
    fn test_dt_two_digit_year_boundaries() {
        // only the stored two-digit year survives: 89 maps to 2089, 90 to 1990
        for (input, expected) in [
            ("1989-03-01 00:00:00", "2089-03-01 00:00:00"),
            ("1990-03-01 00:00:00", "1990-03-01 00:00:00"),
            ("1999-12-31 23:59:59", "1999-12-31 23:59:59"),
            ("2000-01-01 00:00:00", "2000-01-01 00:00:00"),
            ("2089-06-01 00:00:00", "2089-06-01 00:00:00"),
        ] {
            let bytes = pack_ok(Value::Str(input.to_string()), &S7Type::Dt);
            assert_eq!(
                unpack(&bytes, &S7Type::Dt).unwrap(),
                Value::Str(expected.to_string()),
                "year mapping for {}",
                input
            );
        }
    }

    #[test]
    fn test_dt_rejects_malformed() {
        assert!(pack(&Value::Str("not a date".to_string()), &S7Type::Dt).is_err());
        assert!(pack(&Value::Int(0), &S7Type::Dt).is_err());
    }

    #[test]
    fn test_dtl_layout_and_roundtrip() {
        // 2024-06-16 is a Sunday: weekday 1
        let bytes = pack_ok(
            Value::Str("2024-06-16 01:02:03.000250".to_string()),
            &S7Type::Dtl,
        );
        assert_eq!(&bytes[0..2], &2024u16.to_be_bytes());
        assert_eq!(&bytes[2..8], &[6, 16, 1, 1, 2, 3]);
        assert_eq!(&bytes[8..12], &250_000u32.to_be_bytes());
        assert_eq!(
            unpack(&bytes, &S7Type::Dtl).unwrap(),
            Value::Str("2024-06-16 01:02:03.000250 1".to_string())
        );
    }

    #[test]
    fn test_dtl_explicit_weekday_and_padding() {
        let bytes = pack_ok(
            Value::Str("2024-06-15 12:00:00.5 7".to_string()),
            &S7Type::Dtl,
        );
        assert_eq!(bytes[4], 7);
        // ".5" pads right to 500000 microseconds
        assert_eq!(&bytes[8..12], &500_000_000u32.to_be_bytes());
        assert!(pack(
            &Value::Str("2024-06-15 12:00:00 8".to_string()),
            &S7Type::Dtl
        )
        .is_err());
    }

    #[test]
    fn test_dtl_invalid_bytes_rejected() {
        let mut bytes = pack_ok(Value::Str("2024-06-15 12:00:00".to_string()), &S7Type::Dtl);
        bytes[2] = 13; // month 13
        assert!(unpack(&bytes, &S7Type::Dtl).is_err());
    }

    #[test]
    fn test_short_buffer_every_type() {
        for ty in [
            S7Type::Bool,
            S7Type::Byte,
            S7Type::Word,
            S7Type::Int,
            S7Type::DWord,
            S7Type::DInt,
            S7Type::Real,
            S7Type::Dt,
            S7Type::Dtl,
            S7Type::String(4),
            S7Type::WString(4),
        ] {
            let short = vec![0u8; ty.size() - 1];
            match unpack(&short, &ty) {
                Err(SimError::ShortBuffer { needed, got }) => {
                    assert_eq!(needed, ty.size());
                    assert_eq!(got, ty.size() - 1);
                }
                other => panic!("expected ShortBuffer for {}, got {:?}", ty, other),
            }
        }
    }

    #[test]
    fn test_pack_length_matches_contract_for_full_values() {
        let cases: Vec<(Value, S7Type)> = vec![
            (Value::Bool(true), S7Type::Bool),
            (Value::Int(200), S7Type::Byte),
            (Value::Int(40000), S7Type::Word),
            (Value::Int(-2), S7Type::Int),
            (Value::Int(70000), S7Type::DWord),
            (Value::Int(-70000), S7Type::DInt),
            (Value::Real(1.5), S7Type::Real),
            (Value::Str("2024-01-02 03:04:05".to_string()), S7Type::Dt),
            (Value::Str("2024-01-02 03:04:05".to_string()), S7Type::Dtl),
            (Value::Str("abcd".to_string()), S7Type::String(4)),
            (Value::Str("abcd".to_string()), S7Type::WString(4)),
        ];
        for (value, ty) in cases {
            assert_eq!(pack(&value, &ty).unwrap().len(), ty.size(), "{}", ty);
        }
    }
}
