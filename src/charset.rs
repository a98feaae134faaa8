//! Text encodings used by Sypex Geo databases.

use serde::Serialize;
use std::fmt;

/// Charset of the text fields stored in a database file.
///
/// Output is always UTF-8; records from latin1 or cp1251 files are
/// transcoded while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Charset {
    /// UTF-8 (code 0)
    #[default]
    #[serde(rename = "UTF-8")]
    Utf8,
    /// ISO-8859-1 (code 1)
    #[serde(rename = "latin1")]
    Latin1,
    /// Windows-1251 (code 2)
    #[serde(rename = "cp1251")]
    Cp1251,
}

impl Charset {
    /// Convert from the header charset code.
    ///
    /// Returns `None` for unknown codes.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Charset::Utf8),
            1 => Some(Charset::Latin1),
            2 => Some(Charset::Cp1251),
            _ => None,
        }
    }

    /// Convert to the header charset code.
    pub fn code(self) -> u8 {
        match self {
            Charset::Utf8 => 0,
            Charset::Latin1 => 1,
            Charset::Cp1251 => 2,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "latin1",
            Charset::Cp1251 => "cp1251",
        }
    }

    /// Decode raw field bytes into a UTF-8 string.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            // ISO-8859-1 maps every byte to the code point of the same value.
            Charset::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Charset::Cp1251 => encoding_rs::WINDOWS_1251
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
