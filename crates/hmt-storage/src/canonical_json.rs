//! Canonical JSON serialization
//!
//! Produces byte-for-byte the text of Python's
//! `json.dumps(value, sort_keys=True, ensure_ascii=True)`, which is what
//! manifest and result digests published on chain are computed over.
//!
//! # Canonical Format
//!
//! 1. **Key Ordering**: object keys sorted by code point
//! 2. **Separators**: `", "` between items, `": "` after keys
//! 3. **Unicode**: everything outside printable ASCII escaped as `\uXXXX`
//!    (UTF-16 code units, lowercase hex)
//! 4. **Floats**: shortest round-trip repr, exponent form outside
//!    `1e-4 <= |x| < 1e16` (`1e+16`, `1.5e-05`), integral floats keep `.0`
//! 5. **Nulls**: kept
//!
//! ```text
//! {"b": 1, "a": "é"}  ->  {"a": "é", "b": 1}
//! ```

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonicalJsonError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid JSON structure: {0}")]
    InvalidStructure(String),
}

pub type Result<T> = std::result::Result<T, CanonicalJsonError>;

/// Serialize value to canonical JSON text.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let canonical = canonicalize_value(serde_json::to_value(value)?);

    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PythonFormatter);
    canonical.serialize(&mut serializer)?;

    // Every non-ASCII char was escaped above.
    String::from_utf8(out).map_err(|e| CanonicalJsonError::InvalidStructure(e.to_string()))
}

/// SHA-1 hex digest of the canonical JSON text.
pub fn content_digest<T: Serialize>(value: &T) -> Result<String> {
    let text = to_canonical_json(value)?;
    Ok(hex::encode(Sha1::digest(text.as_bytes())))
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize_value(v)))
                .collect();

            let mut canonical_map = Map::new();
            for (k, v) in sorted {
                canonical_map.insert(k, v);
            }
            Value::Object(canonical_map)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize_value).collect()),
        other => other,
    }
}

struct PythonFormatter;

impl Formatter for PythonFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(python_float_repr(value).as_bytes())
    }

    fn write_f32<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f32) -> io::Result<()> {
        writer.write_all(python_float_repr(f64::from(value)).as_bytes())
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
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

/// Python `float.__repr__` for finite values.
fn python_float_repr(value: f64) -> String {
    let sci = format!("{:e}", value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if (-4..16).contains(&exp) {
        let plain = format!("{}", value);
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    }
}
