use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use super::block::Payload;
use crate::error::{LedgerError, Result};

/// JSON formatter producing the ledger's canonical byte form.
///
/// Separators are `", "` and `": "`, floats use the shortest round-trip
/// digits with a two-digit signed exponent outside `1e-4 <= |x| < 1e16`, and
/// every character outside printable ASCII is written as a lowercase
/// `\uXXXX` escape (surrogate pairs above U+FFFF). Ledger files written by
/// earlier tooling hash to the same digests under this form.
#[derive(Debug, Default, Clone, Copy)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(format_float(value).as_bytes())
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Shortest round-trip rendering of a finite float, e.g. `95.0`, `1e-05`,
/// `1e+16`.
pub fn format_float(value: f64) -> String {
    // `{:e}` yields the shortest digits that round-trip, e.g. "-9.5e1".
    let sci = format!("{:e}", value);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let n = digits.len() as i32;
    let decpt = exp + 1;

    let body = if decpt <= -4 || decpt > 16 {
        let (head, tail) = digits.split_at(1);
        let exp_sign = if exp < 0 { '-' } else { '+' };
        if tail.is_empty() {
            format!("{head}e{exp_sign}{:02}", exp.abs())
        } else {
            format!("{head}.{tail}e{exp_sign}{:02}", exp.abs())
        }
    } else if decpt <= 0 {
        format!("0.{}{}", "0".repeat((-decpt) as usize), digits)
    } else if decpt >= n {
        format!("{}{}.0", digits, "0".repeat((decpt - n) as usize))
    } else {
        let (int, frac) = digits.split_at(decpt as usize);
        format!("{int}.{frac}")
    };
    format!("{sign}{body}")
}

/// Rebuild every object with its keys in lexicographic order, whatever map
/// implementation `serde_json` was compiled with.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Canonical bytes of an arbitrary JSON value.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>> {
    let sorted = sort_keys(value.clone());
    let mut out = Vec::with_capacity(160);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    sorted.serialize(&mut ser)?;
    Ok(out)
}

/// Canonical encoding of the five hashed block fields.
pub fn encode_fields(
    index: u64,
    timestamp: f64,
    payload: &Payload,
    prev_digest: &str,
    nonce: u64,
) -> Result<Vec<u8>> {
    let timestamp = Number::from_f64(timestamp)
        .ok_or_else(|| LedgerError::NonCanonical(format!("timestamp {timestamp}")))?;

    let mut fields = Map::new();
    fields.insert("dados".into(), serde_json::to_value(payload)?);
    fields.insert("hash_anterior".into(), Value::String(prev_digest.to_owned()));
    fields.insert("index".into(), Value::from(index));
    fields.insert("nonce".into(), Value::from(nonce));
    fields.insert("timestamp".into(), Value::Number(timestamp));
    canonical_bytes(&Value::Object(fields))
}

/// SHA-256 digest (lowercase hex) of a block's canonical fields.
pub fn hash(
    index: u64,
    timestamp: f64,
    payload: &Payload,
    prev_digest: &str,
    nonce: u64,
) -> Result<String> {
    let bytes = encode_fields(index, timestamp, payload, prev_digest, nonce)?;
    Ok(sha256_hex(&bytes))
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
