//! Sypex Geo binary database format.
//!
//! A file is a fixed header, an embedded record schema, two indexes over
//! the sorted range table, and two record stores addressed by offset.
//!
//! # File Structure
//!
//! ```text
//! +---------------------+
//! |       HEADER        |  40 bytes (fixed, big-endian)
//! +---------------------+
//! |    PACK FORMAT      |  pack_format_size bytes
//! +---------------------+
//! | FIRST OCTET INDEX   |  first_octet_index_count * 4 bytes
//! +---------------------+
//! |     MAIN INDEX      |  main_index_count * 4 bytes
//! +---------------------+
//! |    RANGE TABLE      |  ranges_count * (3 + id_length) bytes
//! +---------------------+
//! |    REGION STORE     |  db_region_length bytes
//! +---------------------+
//! | COUNTRY/CITY STORE  |  db_country_length + db_city_length bytes
//! +---------------------+
//! ```

mod cached_reader;
mod decoder;
mod format;
mod index;
mod locator;
mod pack;
mod reader;
mod storage;

pub use cached_reader::{CacheStats, CachedConfig, CachedSxGeo};
pub use decoder::RecordDecoder;
pub use format::{Header, ParserKind, HEADER_SIZE, PREFIX, RESERVED_OCTETS};
pub use index::{FirstOctetIndex, Layout, MainIndex};
pub use locator::{search_range_table, RangeLocator};
pub use pack::{Field, FieldType, PackFormat, RecordKind};
pub use reader::SxGeo;
pub use storage::{FileStorage, MemoryStorage, MmapStorage, Storage, Store};
