//! Header layout and validation.

use serde::Serialize;

use crate::charset::Charset;
use crate::{Error, Result};

/// Prefix identifying Sypex Geo database files.
pub const PREFIX: [u8; 3] = *b"SxG";

/// Header size in bytes.
pub const HEADER_SIZE: usize = 40;

/// First octets that are never looked up (unspecified, private, loopback).
pub const RESERVED_OCTETS: [u8; 3] = [0, 10, 127];

/// Source the database was converted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ParserKind {
    #[default]
    Universal,
    SxGeoCountry,
    SxGeoCity,
    GeoIpCountry,
    GeoIpCity,
    IpGeoBase,
    Other(u8),
}

impl ParserKind {
    /// Convert from the header parser byte.
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => ParserKind::Universal,
            1 => ParserKind::SxGeoCountry,
            2 => ParserKind::SxGeoCity,
            11 => ParserKind::GeoIpCountry,
            12 => ParserKind::GeoIpCity,
            21 => ParserKind::IpGeoBase,
            other => ParserKind::Other(other),
        }
    }
}

/// One header field, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderField {
    Prefix,
    Version,
    Timestamp,
    Parser,
    Charset,
    FirstOctetIndexCount,
    MainIndexCount,
    OneIndexRange,
    RangesCount,
    IdLength,
    MaxRegionLength,
    MaxCityLength,
    DbRegionLength,
    DbCityLength,
    MaxCountryLength,
    DbCountryLength,
    PackFormatSize,
}

/// Header fields in the order they appear in the file.
const LAYOUT: [HeaderField; 17] = [
    HeaderField::Prefix,
    HeaderField::Version,
    HeaderField::Timestamp,
    HeaderField::Parser,
    HeaderField::Charset,
    HeaderField::FirstOctetIndexCount,
    HeaderField::MainIndexCount,
    HeaderField::OneIndexRange,
    HeaderField::RangesCount,
    HeaderField::IdLength,
    HeaderField::MaxRegionLength,
    HeaderField::MaxCityLength,
    HeaderField::DbRegionLength,
    HeaderField::DbCityLength,
    HeaderField::MaxCountryLength,
    HeaderField::DbCountryLength,
    HeaderField::PackFormatSize,
];

impl HeaderField {
    /// Width on disk in bytes.
    const fn size(self) -> usize {
        match self {
            HeaderField::Prefix => 3,
            HeaderField::Version
            | HeaderField::Parser
            | HeaderField::Charset
            | HeaderField::FirstOctetIndexCount
            | HeaderField::IdLength => 1,
            HeaderField::MainIndexCount
            | HeaderField::OneIndexRange
            | HeaderField::MaxRegionLength
            | HeaderField::MaxCityLength
            | HeaderField::MaxCountryLength
            | HeaderField::PackFormatSize => 2,
            HeaderField::Timestamp
            | HeaderField::RangesCount
            | HeaderField::DbRegionLength
            | HeaderField::DbCityLength
            | HeaderField::DbCountryLength => 4,
        }
    }
}

/// Decode a big-endian unsigned integer of up to 4 bytes.
pub(crate) fn be_uint(raw: &[u8]) -> u32 {
    raw.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

/// Parsed database header (40 bytes, big-endian).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Format version (22 => 2.2)
    pub version: u8,
    /// Unix timestamp when the file was generated
    pub timestamp: u32,
    /// Source the file was converted from
    pub parser: ParserKind,
    /// Charset of text fields
    pub charset: Charset,
    /// Entries in the first-octet index (up to 255)
    pub first_octet_index_count: u8,
    /// Entries in the main index
    pub main_index_count: u16,
    /// Range-table entries covered by one main index entry
    pub one_index_range: u16,
    /// Entries in the range table
    pub ranges_count: u32,
    /// Width of a range-table id (1 for country databases, 3 for city)
    pub id_length: u8,
    /// Maximum size of a region record
    pub max_region_length: u16,
    /// Maximum size of a city record
    pub max_city_length: u16,
    /// Size of the region store
    pub db_region_length: u32,
    /// Size of the city store
    pub db_city_length: u32,
    /// Maximum size of a country record
    pub max_country_length: u16,
    /// Size of the country store
    pub db_country_length: u32,
    /// Size of the pack format descriptor
    pub pack_format_size: u16,
}

impl Header {
    /// Parse and validate a header from the first `HEADER_SIZE` bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::Truncated {
                section: "header",
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut header = Header::default();
        let mut prefix = [0u8; 3];
        let mut charset = 0u8;
        let mut pos = 0;

        for field in LAYOUT {
            let raw = &bytes[pos..pos + field.size()];
            pos += field.size();

            match field {
                HeaderField::Prefix => prefix.copy_from_slice(raw),
                HeaderField::Version => header.version = raw[0],
                HeaderField::Timestamp => header.timestamp = be_uint(raw),
                HeaderField::Parser => header.parser = ParserKind::from_u8(raw[0]),
                HeaderField::Charset => charset = raw[0],
                HeaderField::FirstOctetIndexCount => header.first_octet_index_count = raw[0],
                HeaderField::MainIndexCount => header.main_index_count = be_uint(raw) as u16,
                HeaderField::OneIndexRange => header.one_index_range = be_uint(raw) as u16,
                HeaderField::RangesCount => header.ranges_count = be_uint(raw),
                HeaderField::IdLength => header.id_length = raw[0],
                HeaderField::MaxRegionLength => header.max_region_length = be_uint(raw) as u16,
                HeaderField::MaxCityLength => header.max_city_length = be_uint(raw) as u16,
                HeaderField::DbRegionLength => header.db_region_length = be_uint(raw),
                HeaderField::DbCityLength => header.db_city_length = be_uint(raw),
                HeaderField::MaxCountryLength => header.max_country_length = be_uint(raw) as u16,
                HeaderField::DbCountryLength => header.db_country_length = be_uint(raw),
                HeaderField::PackFormatSize => header.pack_format_size = be_uint(raw) as u16,
            }
        }
        debug_assert_eq!(pos, HEADER_SIZE);

        if prefix != PREFIX {
            return Err(Error::InvalidPrefix(prefix));
        }
        header.charset = Charset::from_code(charset).ok_or(Error::UnknownCharset(charset))?;
        header.validate()?;

        Ok(header)
    }

    /// Check the non-zero invariants every readable file satisfies.
    pub fn validate(&self) -> Result<()> {
        if self.first_octet_index_count == 0 {
            return Err(Error::InvalidHeader("first octet index count is zero"));
        }
        if self.main_index_count == 0 {
            return Err(Error::InvalidHeader("main index count is zero"));
        }
        if self.one_index_range == 0 {
            return Err(Error::InvalidHeader("one index range is zero"));
        }
        if self.ranges_count == 0 {
            return Err(Error::InvalidHeader("ranges count is zero"));
        }
        if self.timestamp == 0 {
            return Err(Error::InvalidHeader("timestamp is zero"));
        }
        if self.id_length == 0 {
            return Err(Error::InvalidHeader("id length is zero"));
        }
        if self.id_length > 4 {
            return Err(Error::InvalidHeader("id length exceeds 4 bytes"));
        }
        Ok(())
    }

    /// Size of one range-table entry: 3 IP bytes plus the id.
    pub fn range_entry_len(&self) -> usize {
        self.id_length as usize + 3
    }

    /// Whether the file carries city (and region) records.
    pub fn has_cities(&self) -> bool {
        self.db_city_length > 0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a header the way the converter writes it.
    pub(crate) fn encode(header: &Header) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.extend_from_slice(&PREFIX);
        out.push(header.version);
        out.extend_from_slice(&header.timestamp.to_be_bytes());
        out.push(match header.parser {
            ParserKind::SxGeoCity => 2,
            _ => 0,
        });
        out.push(header.charset.code());
        out.push(header.first_octet_index_count);
        out.extend_from_slice(&header.main_index_count.to_be_bytes());
        out.extend_from_slice(&header.one_index_range.to_be_bytes());
        out.extend_from_slice(&header.ranges_count.to_be_bytes());
        out.push(header.id_length);
        out.extend_from_slice(&header.max_region_length.to_be_bytes());
        out.extend_from_slice(&header.max_city_length.to_be_bytes());
        out.extend_from_slice(&header.db_region_length.to_be_bytes());
        out.extend_from_slice(&header.db_city_length.to_be_bytes());
        out.extend_from_slice(&header.max_country_length.to_be_bytes());
        out.extend_from_slice(&header.db_country_length.to_be_bytes());
        out.extend_from_slice(&header.pack_format_size.to_be_bytes());
        out
    }

    pub(crate) fn sample() -> Header {
        Header {
            version: 22,
            timestamp: 1_700_000_000,
            parser: ParserKind::SxGeoCity,
            charset: Charset::Utf8,
            first_octet_index_count: 224,
            main_index_count: 1775,
            one_index_range: 1775,
            ranges_count: 3_000_000,
            id_length: 3,
            max_region_length: 175,
            max_city_length: 127,
            db_region_length: 109_388,
            db_city_length: 2_248_590,
            max_country_length: 147,
            db_country_length: 9_387,
            pack_format_size: 150,
        }
    }

    #[test]
    fn test_layout_size() {
        let total: usize = LAYOUT.iter().map(|f| f.size()).sum();
        assert_eq!(total, HEADER_SIZE);
    }

    #[test]
    fn test_parse_sample() {
        let bytes = encode(&sample());
        assert_eq!(bytes.len(), HEADER_SIZE);

        let header = Header::parse(&bytes).unwrap();
        assert_eq!(header, sample());
        assert_eq!(header.range_entry_len(), 6);
        assert!(header.has_cities());
    }

    #[test]
    fn test_fields_are_big_endian() {
        let bytes = encode(&sample());
        // ranges_count sits after prefix(3) version(1) timestamp(4) parser(1)
        // charset(1) first_octet(1) main_index(2) one_index_range(2)
        assert_eq!(&bytes[15..19], &3_000_000u32.to_be_bytes());
    }

    #[test]
    fn test_invalid_prefix() {
        let mut bytes = encode(&sample());
        bytes[0] = b'X';
        assert!(matches!(Header::parse(&bytes), Err(Error::InvalidPrefix(p)) if &p == b"XxG"));
    }

    #[test]
    fn test_unknown_charset() {
        let mut bytes = encode(&sample());
        bytes[9] = 7;
        assert!(matches!(Header::parse(&bytes), Err(Error::UnknownCharset(7))));
    }

    #[test]
    fn test_short_header() {
        let bytes = encode(&sample());
        assert!(matches!(
            Header::parse(&bytes[..20]),
            Err(Error::Truncated { section: "header", expected: HEADER_SIZE, actual: 20 })
        ));
    }

    #[test]
    fn test_zero_counts_rejected() {
        let cases: [fn(&mut Header); 6] = [
            |h| h.first_octet_index_count = 0,
            |h| h.main_index_count = 0,
            |h| h.one_index_range = 0,
            |h| h.ranges_count = 0,
            |h| h.timestamp = 0,
            |h| h.id_length = 0,
        ];
        for mutate in cases {
            let mut header = sample();
            mutate(&mut header);
            let bytes = encode(&header);
            assert!(matches!(Header::parse(&bytes), Err(Error::InvalidHeader(_))));
        }
    }

    #[test]
    fn test_parsed_header_satisfies_invariant() {
        let header = Header::parse(&encode(&sample())).unwrap();
        let min = [
            header.first_octet_index_count as u32,
            header.main_index_count as u32,
            header.one_index_range as u32,
            header.ranges_count,
            header.timestamp,
            header.id_length as u32,
        ]
        .into_iter()
        .min()
        .unwrap();
        assert!(min > 0);
    }

    #[test]
    fn test_parser_kind() {
        assert_eq!(ParserKind::from_u8(2), ParserKind::SxGeoCity);
        assert_eq!(ParserKind::from_u8(21), ParserKind::IpGeoBase);
        assert_eq!(ParserKind::from_u8(99), ParserKind::Other(99));
    }

    #[test]
    fn test_be_uint() {
        assert_eq!(be_uint(&[]), 0);
        assert_eq!(be_uint(&[0x01]), 1);
        assert_eq!(be_uint(&[0x01, 0x02, 0x03]), 0x010203);
        assert_eq!(be_uint(&[0xFF, 0xFF, 0xFF, 0xFF]), u32::MAX);
    }
}
