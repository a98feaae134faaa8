//! Sypex Geo database reader.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::net::Ipv4Addr;
use std::path::Path;

use super::decoder::RecordDecoder;
use super::format::{Header, HEADER_SIZE};
use super::index::{self, read_section, Layout};
use super::locator::RangeLocator;
use super::pack::{PackFormat, RecordKind};
use super::storage::{FileStorage, MemoryStorage, MmapStorage, Storage, Store};
use crate::charset::Charset;
use crate::config::{StorageMode, SxGeoConfig};
use crate::iso::iso_code;
use crate::lookup::GeoLookup;
use crate::record::{Coordinates, FullInfo, Record, Value};
use crate::{Error, Result};

/// Everything parsed from the file before the data stores.
struct Preamble {
    header: Header,
    pack: Option<PackFormat>,
    locator: RangeLocator,
    layout: Layout,
}

fn read_preamble<R: Read>(reader: &mut R) -> Result<Preamble> {
    let raw = read_section(reader, HEADER_SIZE, "header")?;
    let header = Header::parse(&raw)?;

    let pack = if header.pack_format_size > 0 {
        let raw = read_section(reader, header.pack_format_size as usize, "pack format")?;
        Some(PackFormat::parse(&raw)?)
    } else {
        None
    };

    let (first_octet, main) = index::load(reader, &header)?;
    let locator = RangeLocator::new(&header, first_octet, main);
    let layout = Layout::new(&header);

    Ok(Preamble {
        header,
        pack,
        locator,
        layout,
    })
}

/// Reader for one Sypex Geo database file.
///
/// Indexes are parsed at open time and never change afterwards; record
/// data is fetched through the configured [`Storage`] backend.
///
/// # Example
///
/// ```ignore
/// use sxgeo::{GeoLookup, SxGeo, SxGeoConfig};
/// use std::path::Path;
///
/// let db = SxGeo::open_with_config(Path::new("SxGeoCity.dat"), SxGeoConfig::memory())?;
/// assert_eq!(db.country_iso("77.37.136.11").as_deref(), Some("RU"));
/// ```
pub struct SxGeo {
    header: Header,
    pack: Option<PackFormat>,
    locator: RangeLocator,
    layout: Layout,
    decoder: RecordDecoder,
    storage: Box<dyn Storage>,
}

impl SxGeo {
    /// Open a database file in file mode.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, SxGeoConfig::default())
    }

    /// Open a database file with the given storage mode.
    pub fn open_with_config(path: &Path, config: SxGeoConfig) -> Result<Self> {
        let mut file = File::open(path)?;
        let preamble = read_preamble(&mut file)?;
        let layout = preamble.layout;

        let file_len = file.metadata()?.len();
        if file_len < layout.end() {
            return Err(Error::Truncated {
                section: "database",
                expected: layout.end() as usize,
                actual: file_len as usize,
            });
        }

        let storage: Box<dyn Storage> = match config.mode {
            StorageMode::File => Box::new(FileStorage::new(file, layout)),
            StorageMode::Memory => {
                let storage = MemoryStorage::load(&mut file, &layout)?;
                drop(file);
                log::debug!("Released {:?} after loading stores into memory", path);
                Box::new(storage)
            }
            StorageMode::Mmap => Box::new(MmapStorage::map(&file, layout)?),
        };

        log::debug!(
            "Opened {:?}: version {}, {} ranges, charset {}, mode {}",
            path,
            preamble.header.version,
            preamble.header.ranges_count,
            preamble.header.charset,
            config.mode
        );

        Ok(Self::assemble(preamble, storage))
    }

    /// Open a complete database image held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let preamble = read_preamble(&mut &data[..])?;
        let storage = MemoryStorage::from_bytes(data, &preamble.layout)?;
        Ok(Self::assemble(preamble, Box::new(storage)))
    }

    fn assemble(preamble: Preamble, storage: Box<dyn Storage>) -> Self {
        let Preamble {
            header,
            pack,
            locator,
            layout,
        } = preamble;
        log::debug!(
            "Layout: ranges at {}, regions at {}, cities at {} (end {})",
            layout.ranges_begin,
            layout.regions_begin,
            layout.cities_begin,
            layout.end()
        );

        Self {
            decoder: RecordDecoder::new(header.charset),
            header,
            pack,
            locator,
            layout,
            storage,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Record schema, or `None` when the file carries none.
    pub fn pack_format(&self) -> Option<&PackFormat> {
        self.pack.as_ref()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn charset(&self) -> Charset {
        self.header.charset
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage.mode()
    }

    /// Whether the file carries city and region records.
    pub fn has_cities(&self) -> bool {
        self.header.has_cities()
    }

    /// Raw range-table id for `ip`; 0 means no data.
    ///
    /// On a city database the id is a record offset; on a country-only
    /// database it is the country id.
    pub fn locate(&self, ip: Ipv4Addr) -> u32 {
        self.locator
            .locate(ip, self.storage.as_ref())
            .unwrap_or_else(|e| {
                log::debug!("Range lookup failed for {}: {}", ip, e);
                0
            })
    }

    fn lookup_id(&self, ip: &str) -> Option<u32> {
        let ip: Ipv4Addr = ip.parse().ok()?;
        Some(self.locate(ip)).filter(|id| *id != 0)
    }

    /// Full composition for a range-table id.
    pub fn full_info_for_id(&self, id: u32) -> Option<FullInfo> {
        if id == 0 {
            return None;
        }
        if !self.has_cities() {
            return Some(FullInfo {
                city: None,
                region: None,
                country: country_stub(id as u64),
            });
        }
        self.compose_logged(id, true)
    }

    fn compose_logged(&self, id: u32, full: bool) -> Option<FullInfo> {
        self.compose(id, full).unwrap_or_else(|e| {
            log::debug!("Failed to decode records for id {}: {}", id, e);
            None
        })
    }

    /// Decode the records behind a city-database id.
    ///
    /// Without `full` the region is skipped and the country is reduced to
    /// `{id, iso}`.
    ///
    /// With `full` a nonzero region `country_seek` replaces the city's
    /// `country_id`, so the two forms can name different countries.
    fn compose(&self, id: u32, full: bool) -> Result<Option<FullInfo>> {
        let Some(pack) = &self.pack else {
            return Ok(None);
        };
        let seek = id as u64;
        let only_country = seek < self.header.db_country_length as u64;

        let (mut city, mut country) = if only_country {
            let country = self.read_record(pack, RecordKind::Country, Store::Cities, seek)?;
            let mut city = RecordDecoder::empty(pack.city());
            match country.coordinates() {
                Some(Coordinates { lat, lon }) => {
                    city.insert("lat", lat);
                    city.insert("lon", lon);
                }
                None => {
                    city.remove("lat");
                    city.remove("lon");
                }
            }
            (city, country)
        } else {
            let mut city = self.read_record(pack, RecordKind::City, Store::Cities, seek)?;
            let country_id = city.remove("country_id").and_then(|v| v.as_u64()).unwrap_or(0);
            (city, country_stub(country_id))
        };

        let region_seek = city.remove("region_seek").and_then(|v| v.as_u64()).unwrap_or(0);

        if !full {
            return Ok(Some(FullInfo {
                city: Some(city),
                region: None,
                country: reduce_country(&country),
            }));
        }

        let mut region = self.read_record(pack, RecordKind::Region, Store::Regions, region_seek)?;
        let country_seek = region.remove("country_seek").and_then(|v| v.as_u64()).unwrap_or(0);

        if !only_country && country_seek > 0 {
            let resolved = self.read_record(pack, RecordKind::Country, Store::Cities, country_seek)?;
            let stub_id = country.get("id").and_then(Value::as_u64);
            let resolved_id = resolved.get("id").and_then(Value::as_u64);
            if stub_id != resolved_id {
                log::warn!(
                    "Country mismatch for id {}: city says {:?}, region says {:?}",
                    id,
                    stub_id,
                    resolved_id
                );
            }
            country = resolved;
        }

        Ok(Some(FullInfo {
            city: Some(city),
            region: Some(region),
            country,
        }))
    }

    /// Decode one record; a zero seek yields the zero record.
    fn read_record(&self, pack: &PackFormat, kind: RecordKind, store: Store, seek: u64) -> Result<Record> {
        let fields = pack.fields(kind);
        let max_len = match kind {
            RecordKind::Country => self.header.max_country_length,
            RecordKind::Region => self.header.max_region_length,
            RecordKind::City => self.header.max_city_length,
        } as usize;

        if seek == 0 || max_len == 0 {
            return Ok(RecordDecoder::empty(fields));
        }
        let raw = self.storage.read(store, seek as usize, max_len)?;
        self.decoder.decode(fields, &raw)
    }
}

/// `{id, iso}` country record from the static ISO table.
fn country_stub(id: u64) -> Record {
    let iso = u32::try_from(id).ok().and_then(iso_code).unwrap_or("");
    [("id", Value::UInt(id)), ("iso", Value::from(iso))]
        .into_iter()
        .collect()
}

fn reduce_country(country: &Record) -> Record {
    let id = country.get("id").cloned().unwrap_or(Value::UInt(0));
    let iso = country.get("iso").cloned().unwrap_or_else(|| Value::from(""));
    [("id", id), ("iso", iso)].into_iter().collect()
}

impl GeoLookup for SxGeo {
    fn country_id(&self, ip: &str) -> Option<u32> {
        let id = self.lookup_id(ip)?;
        if !self.has_cities() {
            return Some(id);
        }
        self.compose_logged(id, false)?
            .country
            .get("id")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v != 0)
    }

    fn country_iso(&self, ip: &str) -> Option<String> {
        let id = self.lookup_id(ip)?;
        if !self.has_cities() {
            return iso_code(id).map(str::to_string);
        }
        self.compose_logged(id, false)?
            .country
            .get("iso")
            .and_then(Value::as_str)
            .filter(|iso| !iso.is_empty())
            .map(str::to_string)
    }

    fn full_info(&self, ip: &str) -> Option<FullInfo> {
        self.full_info_for_id(self.lookup_id(ip)?)
    }

    fn coordinates(&self, ip: &str) -> Option<Coordinates> {
        if !self.has_cities() {
            return None;
        }
        self.full_info(ip)?.coordinates()
    }
}

impl fmt::Debug for SxGeo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SxGeo")
            .field("header", &self.header)
            .field("pack", &self.pack)
            .field("layout", &self.layout)
            .field("mode", &self.storage.mode())
            .finish_non_exhaustive()
    }
}
