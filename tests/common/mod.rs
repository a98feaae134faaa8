//! Synthetic database builder shared by integration tests and benchmarks.

#![allow(dead_code)]

use std::io::Write;
use std::net::Ipv4Addr;

pub const COUNTRY_FORMAT: &str = "T:id/c2:iso/n2:lat/n2:lon/b:name_ru/b:name_en";
pub const REGION_FORMAT: &str = "M:country_seek/b:name_ru/b:name_en/c7:iso";
pub const CITY_FORMAT: &str = "M:region_seek/T:country_id/M:id/N5:lat/N5:lon/b:name_ru/b:name_en";

const FIRST_OCTETS: u32 = 224;

pub fn ip(s: &str) -> u32 {
    s.parse::<Ipv4Addr>().unwrap().into()
}

fn u24(v: u32) -> [u8; 3] {
    let b = v.to_le_bytes();
    [b[0], b[1], b[2]]
}

fn cstr(out: &mut Vec<u8>, text: &[u8]) {
    out.extend_from_slice(text);
    out.push(0);
}

/// Country record in `COUNTRY_FORMAT`.
pub fn country_record(id: u8, iso: &str, lat: f64, lon: f64, name_ru: &[u8], name_en: &[u8]) -> Vec<u8> {
    let mut out = vec![id];
    out.extend_from_slice(&iso.as_bytes()[..2]);
    out.extend_from_slice(&((lat * 100.0).round() as i16).to_le_bytes());
    out.extend_from_slice(&((lon * 100.0).round() as i16).to_le_bytes());
    cstr(&mut out, name_ru);
    cstr(&mut out, name_en);
    out
}

/// Region record in `REGION_FORMAT`.
pub fn region_record(country_seek: u32, name_ru: &[u8], name_en: &[u8], iso: &str) -> Vec<u8> {
    let mut out = u24(country_seek).to_vec();
    cstr(&mut out, name_ru);
    cstr(&mut out, name_en);
    let mut code = iso.as_bytes().to_vec();
    code.resize(7, 0);
    out.extend_from_slice(&code);
    out
}

/// City record in `CITY_FORMAT`.
pub fn city_record(
    region_seek: u32,
    country_id: u8,
    id: u32,
    lat: f64,
    lon: f64,
    name_ru: &[u8],
    name_en: &[u8],
) -> Vec<u8> {
    let mut out = u24(region_seek).to_vec();
    out.push(country_id);
    out.extend_from_slice(&u24(id));
    out.extend_from_slice(&((lat * 100_000.0).round() as i32).to_le_bytes());
    out.extend_from_slice(&((lon * 100_000.0).round() as i32).to_le_bytes());
    cstr(&mut out, name_ru);
    cstr(&mut out, name_en);
    out
}

/// Assembles a database image the way the converter lays it out.
///
/// Every covered first octet starts with a `x.0.0.0 -> 0` boundary, so
/// the first-octet slices are never empty.
pub struct DbBuilder {
    pub charset: u8,
    pub timestamp: u32,
    pub pack_format: Option<String>,
    pub id_length: u8,
    pub one_index_range: u16,
    ranges: Vec<(u32, u32)>,
    regions: Vec<u8>,
    countries: Vec<u8>,
    cities: Vec<u8>,
    max_region_length: u16,
    max_city_length: u16,
    max_country_length: u16,
}

impl DbBuilder {
    fn new(id_length: u8) -> Self {
        Self {
            charset: 0,
            timestamp: 1_700_000_000,
            pack_format: None,
            id_length,
            one_index_range: 16,
            ranges: (1..FIRST_OCTETS).map(|octet| (octet << 24, 0)).collect(),
            regions: Vec::new(),
            countries: Vec::new(),
            cities: Vec::new(),
            max_region_length: 0,
            max_city_length: 0,
            max_country_length: 0,
        }
    }

    /// City database: 3-byte ids and the three-group pack format.
    ///
    /// Offset 0 of the region and country stores is padding so that no
    /// real record sits at seek 0.
    pub fn city() -> Self {
        let mut builder = Self::new(3);
        builder.pack_format = Some(format!("{}\0{}\0{}", COUNTRY_FORMAT, REGION_FORMAT, CITY_FORMAT));
        builder.regions.push(0);
        builder.countries.push(0);
        builder
    }

    /// Country-only database: 1-byte country ids, no record stores.
    pub fn country() -> Self {
        Self::new(1)
    }

    /// Map addresses from `start` up to the next boundary to `id`.
    pub fn range(&mut self, start: &str, id: u32) -> &mut Self {
        let boundary = ip(start);
        self.ranges.retain(|(b, _)| *b != boundary);
        self.ranges.push((boundary, id));
        self
    }

    /// Append a country record; returns its seek.
    ///
    /// Countries must be added before cities.
    pub fn add_country(&mut self, record: &[u8]) -> u32 {
        assert!(self.cities.is_empty(), "countries must precede cities");
        let seek = self.countries.len() as u32;
        self.countries.extend_from_slice(record);
        self.max_country_length = self.max_country_length.max(record.len() as u16);
        seek
    }

    /// Append a region record; returns its seek.
    pub fn add_region(&mut self, record: &[u8]) -> u32 {
        let seek = self.regions.len() as u32;
        self.regions.extend_from_slice(record);
        self.max_region_length = self.max_region_length.max(record.len() as u16);
        seek
    }

    /// Append a city record; returns its seek in the combined store.
    pub fn add_city(&mut self, record: &[u8]) -> u32 {
        let seek = (self.countries.len() + self.cities.len()) as u32;
        self.cities.extend_from_slice(record);
        self.max_city_length = self.max_city_length.max(record.len() as u16);
        seek
    }

    pub fn build(&self) -> Vec<u8> {
        let mut ranges = self.ranges.clone();
        ranges.sort();

        let range = self.one_index_range as usize;
        let blocks = ranges.len().div_ceil(range);
        let pack = self.pack_format.as_deref().unwrap_or("").as_bytes();

        let mut out = Vec::new();
        out.extend_from_slice(b"SxG");
        out.push(22);
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.push(2);
        out.push(self.charset);
        out.push(FIRST_OCTETS as u8);
        out.extend_from_slice(&(blocks as u16).to_be_bytes());
        out.extend_from_slice(&self.one_index_range.to_be_bytes());
        out.extend_from_slice(&(ranges.len() as u32).to_be_bytes());
        out.push(self.id_length);
        out.extend_from_slice(&self.max_region_length.to_be_bytes());
        out.extend_from_slice(&self.max_city_length.to_be_bytes());
        out.extend_from_slice(&(self.regions.len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.cities.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.max_country_length.to_be_bytes());
        out.extend_from_slice(&(self.countries.len() as u32).to_be_bytes());
        out.extend_from_slice(&(pack.len() as u16).to_be_bytes());
        assert_eq!(out.len(), 40);

        out.extend_from_slice(pack);

        // Cumulative entry counts per first octet
        for octet in 0..FIRST_OCTETS {
            let count = ranges.iter().filter(|(b, _)| b >> 24 <= octet).count() as u32;
            out.extend_from_slice(&count.to_be_bytes());
        }

        // Last address covered by each block
        for block in 0..blocks {
            let last = ranges
                .get((block + 1) * range)
                .map_or(u32::MAX, |(next, _)| next - 1);
            out.extend_from_slice(&last.to_be_bytes());
        }

        let id_length = self.id_length as usize;
        for (boundary, id) in &ranges {
            out.extend_from_slice(&boundary.to_be_bytes()[1..]);
            out.extend_from_slice(&id.to_be_bytes()[4 - id_length..]);
        }

        out.extend_from_slice(&self.regions);
        out.extend_from_slice(&self.countries);
        out.extend_from_slice(&self.cities);
        out
    }
}

/// Seeks of the records in [`city_database`].
pub struct CityFixture {
    pub data: Vec<u8>,
    pub ru: u32,
    pub de: u32,
    pub moscow_region: u32,
    pub moscow: u32,
    pub berlin: u32,
}

/// City database covering:
///
/// - `77.37.0.0/16`: Moscow (city granularity)
/// - `77.38.0.0 - 77.39.255.255`: Russia (country granularity)
/// - `77.50.0.0/16`: Berlin, whose region is unknown
/// - `88.x.0.0/16`: Moscow for odd `x`, Germany for even `x`
pub fn city_database() -> CityFixture {
    city_database_with(TextEncoding::Utf8)
}

/// Text encodings the fixture can store names in.
#[derive(Clone, Copy)]
pub enum TextEncoding {
    Utf8,
    Cp1251,
}

fn encode(charset: TextEncoding, text: &str) -> Vec<u8> {
    match charset {
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
        TextEncoding::Cp1251 => encoding_rs::WINDOWS_1251.encode(text).0.into_owned(),
    }
}

pub fn city_database_with(charset: TextEncoding) -> CityFixture {
    let mut builder = DbBuilder::city();
    builder.charset = match charset {
        TextEncoding::Utf8 => 0,
        TextEncoding::Cp1251 => 2,
    };
    let text = |s: &str| encode(charset, s);

    let ru = builder.add_country(&country_record(185, "RU", 60.0, 100.0, &text("Россия"), b"Russia"));
    let de = builder.add_country(&country_record(56, "DE", 51.0, 9.0, &text("Германия"), b"Germany"));
    let moscow_region = builder.add_region(&region_record(ru, &text("Москва"), b"Moskva", "RU-MOW"));
    let moscow = builder.add_city(&city_record(
        moscow_region,
        185,
        524_901,
        55.75222,
        37.61556,
        &text("Москва"),
        b"Moscow",
    ));
    let berlin = builder.add_city(&city_record(0, 56, 2_950_159, 52.52437, 13.41053, &text("Берлин"), b"Berlin"));

    builder
        .range("77.37.0.0", moscow)
        .range("77.38.0.0", ru)
        .range("77.40.0.0", 0)
        .range("77.50.0.0", berlin)
        .range("77.51.0.0", 0);
    for second in 1..=255u32 {
        let id = if second % 2 == 1 { moscow } else { de };
        builder.range(&format!("88.{}.0.0", second), id);
    }

    CityFixture {
        data: builder.build(),
        ru,
        de,
        moscow_region,
        moscow,
        berlin,
    }
}

/// Country-only database over the same address plan.
pub fn country_database() -> Vec<u8> {
    let mut builder = DbBuilder::country();
    builder
        .range("77.37.0.0", 185)
        .range("77.40.0.0", 0)
        .range("77.50.0.0", 56)
        .range("77.51.0.0", 0);
    for second in 1..=255u32 {
        let id = if second % 2 == 1 { 185 } else { 56 };
        builder.range(&format!("88.{}.0.0", second), id);
    }
    builder.build()
}

/// Write `data` to a temporary file that lives as long as the handle.
pub fn write_temp(data: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}
