//! sxgeo - A reader for Sypex Geo binary IPv4 geolocation databases.
//!
//! This crate decodes `SxGeo*.dat` files and answers point lookups from a
//! local file without a database engine.
//!
//! # Features
//!
//! - **Country and city databases**: Both `SxGeo.dat` (country ids only) and
//!   `SxGeoCity.dat` (country, region and city records)
//! - **Self-describing records**: Field layout comes from the file's own
//!   pack format, so custom conversions decode without code changes
//! - **Storage modes**: Positioned file reads, fully in-memory, or
//!   memory-mapped, all returning identical results
//! - **Charset conversion**: latin1 and cp1251 text is transcoded to UTF-8
//! - **Caching and hot reload**: [`CachedSxGeo`] caches composed results and
//!   swaps databases atomically
//!
//! # Quick Start
//!
//! ```ignore
//! use sxgeo::{GeoLookup, SxGeo, SxGeoConfig};
//! use std::path::Path;
//!
//! let db = SxGeo::open_with_config(Path::new("SxGeoCity.dat"), SxGeoConfig::memory())?;
//!
//! assert_eq!(db.country_iso("77.37.136.11").as_deref(), Some("RU"));
//! if let Some(info) = db.full_info("77.37.136.11") {
//!     println!("{}", serde_json::to_string(&info)?);
//! }
//! ```
//!
//! # Lookup Semantics
//!
//! Every lookup returns `None` rather than an error when there is no data:
//! for unparseable input, for the reserved first octets 0, 10 and 127, and
//! for addresses the database does not cover. Errors surface only while
//! opening a file.

mod charset;
mod config;
mod error;
mod lookup;
mod record;

pub mod binary;
pub mod iso;

// Re-export core types
pub use charset::Charset;
pub use config::{StorageMode, SxGeoConfig};
pub use error::{Error, Result};
pub use lookup::GeoLookup;
pub use record::{Coordinates, FullInfo, Record, Value};

// Re-export reader types
pub use binary::{CacheStats, CachedConfig, CachedSxGeo, Header, PackFormat, SxGeo};
