//! Pack format: the per-file record schema.
//!
//! The descriptor is three NUL-separated groups (country, region, city).
//! Each group is a `/`-separated list of `TYPE:NAME` fields, e.g.
//! `T:id/c2:iso/n2:lat/n2:lon/b:name_ru/b:name_en`.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::{Error, Result};

/// Type of one pack-format field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `t`: signed 1-byte integer
    I8,
    /// `T`: unsigned 1-byte integer
    U8,
    /// `s`: signed 2-byte integer
    I16,
    /// `S`: unsigned 2-byte integer
    U16,
    /// `m`: signed 3-byte integer
    I24,
    /// `M`: unsigned 3-byte integer
    U24,
    /// `i`: signed 4-byte integer
    I32,
    /// `I`: unsigned 4-byte integer
    U32,
    /// `f`: 4-byte float
    F32,
    /// `d`: 8-byte double
    F64,
    /// `nX`: signed 2-byte integer divided by 10^X
    Fixed16 { scale: u8 },
    /// `NX`: signed 4-byte integer divided by 10^X
    Fixed32 { scale: u8 },
    /// `cX`: fixed-width string of X bytes
    FixedStr { len: usize },
    /// `b`: NUL-terminated string
    CStr,
}

impl FieldType {
    /// Parse a type token such as `T`, `N5` or `c2`.
    ///
    /// Digits after the type letter are the string length for `c` and the
    /// decimal scale for `n`/`N`; both default to 1.
    pub fn parse(token: &str, field: &str) -> Result<Self> {
        let mut chars = token.chars();
        let ty = chars
            .next()
            .ok_or_else(|| Error::InvalidPackFormat(format!("empty type for field '{}'", field)))?;
        let digits = chars.as_str();
        let size: u32 = if digits.is_empty() {
            1
        } else {
            digits.parse().map_err(|_| {
                Error::InvalidPackFormat(format!("bad size '{}' for field '{}'", digits, field))
            })?
        };
        let scale = || {
            u8::try_from(size)
                .ok()
                .filter(|s| *s <= 18)
                .ok_or_else(|| Error::InvalidPackFormat(format!("scale {} too large for field '{}'", size, field)))
        };

        Ok(match ty {
            't' => FieldType::I8,
            'T' => FieldType::U8,
            's' => FieldType::I16,
            'S' => FieldType::U16,
            'm' => FieldType::I24,
            'M' => FieldType::U24,
            'i' => FieldType::I32,
            'I' => FieldType::U32,
            'f' => FieldType::F32,
            'd' => FieldType::F64,
            'n' => FieldType::Fixed16 { scale: scale()? },
            'N' => FieldType::Fixed32 { scale: scale()? },
            'c' => FieldType::FixedStr { len: size as usize },
            'b' => FieldType::CStr,
            other => {
                return Err(Error::UnknownFieldType {
                    ty: other,
                    field: field.to_string(),
                })
            }
        })
    }

    /// Width in bytes, or `None` for NUL-terminated strings.
    pub fn width(&self) -> Option<usize> {
        match self {
            FieldType::I8 | FieldType::U8 => Some(1),
            FieldType::I16 | FieldType::U16 | FieldType::Fixed16 { .. } => Some(2),
            FieldType::I24 | FieldType::U24 => Some(3),
            FieldType::I32 | FieldType::U32 | FieldType::F32 | FieldType::Fixed32 { .. } => Some(4),
            FieldType::F64 => Some(8),
            FieldType::FixedStr { len } => Some(*len),
            FieldType::CStr => None,
        }
    }

    /// Whether the field decodes to text.
    pub fn is_text(&self) -> bool {
        matches!(self, FieldType::FixedStr { .. } | FieldType::CStr)
    }

    /// Whether the field decodes to a float.
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            FieldType::F32 | FieldType::F64 | FieldType::Fixed16 { .. } | FieldType::Fixed32 { .. }
        )
    }

    /// Type letter as it appears in the descriptor.
    pub fn letter(&self) -> char {
        match self {
            FieldType::I8 => 't',
            FieldType::U8 => 'T',
            FieldType::I16 => 's',
            FieldType::U16 => 'S',
            FieldType::I24 => 'm',
            FieldType::U24 => 'M',
            FieldType::I32 => 'i',
            FieldType::U32 => 'I',
            FieldType::F32 => 'f',
            FieldType::F64 => 'd',
            FieldType::Fixed16 { .. } => 'n',
            FieldType::Fixed32 { .. } => 'N',
            FieldType::FixedStr { .. } => 'c',
            FieldType::CStr => 'b',
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Fixed16 { scale } | FieldType::Fixed32 { scale } => {
                write!(f, "{}{}", self.letter(), scale)
            }
            FieldType::FixedStr { len } => write!(f, "c{}", len),
            _ => write!(f, "{}", self.letter()),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One named field of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

impl Field {
    /// Parse a `TYPE:NAME` spec.
    pub fn parse(spec: &str) -> Result<Self> {
        let (token, name) = spec
            .split_once(':')
            .ok_or_else(|| Error::InvalidPackFormat(format!("field '{}' has no type", spec)))?;
        if name.is_empty() {
            return Err(Error::InvalidPackFormat(format!(
                "field '{}' has no name",
                spec
            )));
        }
        Ok(Self {
            name: name.to_string(),
            ty: FieldType::parse(token, name)?,
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ty, self.name)
    }
}

/// Record family a field group describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Country = 0,
    Region = 1,
    City = 2,
}

/// Parsed pack format: field groups for country, region and city records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackFormat {
    country: Vec<Field>,
    region: Vec<Field>,
    city: Vec<Field>,
}

impl PackFormat {
    /// Parse the raw descriptor block.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| Error::InvalidPackFormat(format!("descriptor is not ASCII: {}", e)))?;
        let text = text.strip_suffix('\0').unwrap_or(text);

        let groups: Vec<&str> = text.split('\0').collect();
        if groups.len() != 3 {
            return Err(Error::InvalidPackFormat(format!(
                "expected 3 field groups, found {}",
                groups.len()
            )));
        }

        let parse_group = |group: &str| -> Result<Vec<Field>> {
            group
                .split('/')
                .filter(|spec| !spec.is_empty())
                .map(Field::parse)
                .collect()
        };

        Ok(Self {
            country: parse_group(groups[0])?,
            region: parse_group(groups[1])?,
            city: parse_group(groups[2])?,
        })
    }

    /// Fields of the given record family.
    pub fn fields(&self, kind: RecordKind) -> &[Field] {
        match kind {
            RecordKind::Country => &self.country,
            RecordKind::Region => &self.region,
            RecordKind::City => &self.city,
        }
    }

    pub fn country(&self) -> &[Field] {
        &self.country
    }

    pub fn region(&self) -> &[Field] {
        &self.region
    }

    pub fn city(&self) -> &[Field] {
        &self.city
    }
}
