//! Record decoding driven by the pack format.
//!
//! Numeric fields are little-endian; text fields are right-trimmed and
//! transcoded to UTF-8.

use super::pack::{Field, FieldType};
use crate::charset::Charset;
use crate::record::{Record, Value};
use crate::{Error, Result};

/// Characters stripped from the end of text fields.
const TRIMMED: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

/// Decodes raw record bytes into [`Record`]s.
#[derive(Debug, Clone, Copy)]
pub struct RecordDecoder {
    charset: Charset,
}

impl RecordDecoder {
    pub fn new(charset: Charset) -> Self {
        Self { charset }
    }

    /// Decode `raw` field by field.
    ///
    /// Empty input yields the zero record for `fields`. Trailing bytes
    /// beyond the last field are ignored.
    pub fn decode(&self, fields: &[Field], raw: &[u8]) -> Result<Record> {
        if raw.is_empty() {
            return Ok(Self::empty(fields));
        }

        let mut record = Record::with_capacity(fields.len());
        let mut pos = 0;

        for field in fields {
            let rest = raw.get(pos..).unwrap_or_default();
            let len = match field.ty.width() {
                Some(len) => len,
                // The terminator belongs to the field.
                None => rest.iter().position(|&b| b == 0).map_or(rest.len(), |i| i + 1),
            };
            let bytes = rest.get(..len).ok_or(Error::Truncated {
                section: "record",
                expected: pos + len,
                actual: raw.len(),
            })?;

            record.insert(field.name.as_str(), self.value(field.ty, bytes));
            pos += len;
        }

        Ok(record)
    }

    /// Zero record: empty strings for text fields, 0 for numbers.
    pub fn empty(fields: &[Field]) -> Record {
        fields
            .iter()
            .map(|field| (field.name.as_str(), zero(field.ty)))
            .collect()
    }

    /// `bytes` is exactly the field's width.
    fn value(&self, ty: FieldType, bytes: &[u8]) -> Value {
        match ty {
            FieldType::I8 => Value::Int(bytes[0] as i8 as i64),
            FieldType::U8 => Value::UInt(bytes[0] as u64),
            FieldType::I16 => Value::Int(le_i16(bytes) as i64),
            FieldType::U16 => Value::UInt(u16::from_le_bytes([bytes[0], bytes[1]]) as u64),
            FieldType::I24 => Value::Int(le_i24(bytes) as i64),
            FieldType::U24 => Value::UInt(le_u24(bytes) as u64),
            FieldType::I32 => Value::Int(le_i32(bytes) as i64),
            FieldType::U32 => Value::UInt(u32::from_le_bytes(quad(bytes)) as u64),
            FieldType::F32 => Value::Float(f32::from_le_bytes(quad(bytes)) as f64),
            FieldType::F64 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                Value::Float(f64::from_le_bytes(buf))
            }
            FieldType::Fixed16 { scale } => Value::Float(le_i16(bytes) as f64 / 10f64.powi(scale as i32)),
            FieldType::Fixed32 { scale } => Value::Float(le_i32(bytes) as f64 / 10f64.powi(scale as i32)),
            FieldType::FixedStr { .. } | FieldType::CStr => Value::Text(self.text(bytes)),
        }
    }

    fn text(&self, bytes: &[u8]) -> String {
        let end = bytes
            .iter()
            .rposition(|&b| !TRIMMED.contains(&(b as char)))
            .map_or(0, |i| i + 1);
        self.charset.decode(&bytes[..end])
    }
}

fn zero(ty: FieldType) -> Value {
    if ty.is_text() {
        Value::Text(String::new())
    } else if ty.is_float() {
        Value::Float(0.0)
    } else {
        match ty {
            FieldType::I8 | FieldType::I16 | FieldType::I24 | FieldType::I32 => Value::Int(0),
            _ => Value::UInt(0),
        }
    }
}

fn quad(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

fn le_i16(bytes: &[u8]) -> i16 {
    i16::from_le_bytes([bytes[0], bytes[1]])
}

fn le_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes(quad(bytes))
}

fn le_u24(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0])
}

/// Sign-extend from bit 23.
fn le_i24(bytes: &[u8]) -> i32 {
    let fill = if bytes[2] & 0x80 != 0 { 0xFF } else { 0 };
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], fill])
}
