//! Cached database reader with hot reload support.
//!
//! This module provides a lookup front end with:
//! - LRU cache of composed results keyed by range-table id
//! - Atomic hot reload for swapping in a new database without downtime
//! - Thread-safe concurrent access

use arc_swap::ArcSwap;
use quick_cache::sync::Cache;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::reader::SxGeo;
use crate::config::SxGeoConfig;
use crate::lookup::GeoLookup;
use crate::record::{Coordinates, FullInfo};
use crate::Result;

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Cache key: reload generation plus range-table id.
///
/// Many addresses share one id, so caching by id keeps the cache small
/// and makes hits independent of the exact address.
type CacheKey = (u64, u32);

/// Configuration for the cached reader.
#[derive(Debug, Clone)]
pub struct CachedConfig {
    /// Maximum number of entries in the cache.
    pub cache_capacity: usize,
    /// Whether to enable caching.
    pub cache_enabled: bool,
}

impl Default for CachedConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_enabled: true,
        }
    }
}

impl CachedConfig {
    /// Create a new configuration with the specified cache capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache_capacity: capacity,
            cache_enabled: true,
        }
    }

    /// Create a configuration with caching disabled.
    pub fn no_cache() -> Self {
        Self {
            cache_capacity: 0,
            cache_enabled: false,
        }
    }
}

/// Cached database reader with hot reload support.
///
/// This reader wraps [`SxGeo`] and adds:
/// - LRU cache of full-info results to avoid repeated record decoding
/// - Atomic hot reload to replace the database without service interruption
///
/// # Example
///
/// ```ignore
/// use sxgeo::{CachedSxGeo, GeoLookup};
/// use std::path::Path;
///
/// let db = CachedSxGeo::open(Path::new("SxGeoCity.dat"))?;
/// let city = db.city("77.37.136.11");
///
/// // Swap in a newer release
/// db.reload(Path::new("SxGeoCity.new.dat"))?;
/// ```
pub struct CachedSxGeo {
    /// The underlying reader, wrapped in ArcSwap for atomic replacement.
    inner: ArcSwap<SxGeo>,
    /// LRU cache of composed results; `None` entries record misses.
    cache: Option<Cache<CacheKey, Option<Arc<FullInfo>>>>,
    /// Open configuration reused on reload.
    db_config: SxGeoConfig,
    /// Cache configuration.
    config: CachedConfig,
    /// Generation counter for cache invalidation.
    generation: AtomicU64,
}

impl CachedSxGeo {
    /// Open a database file with default configuration.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, SxGeoConfig::default(), CachedConfig::default())
    }

    /// Open a database file with custom configuration.
    pub fn open_with_config(path: &Path, db_config: SxGeoConfig, config: CachedConfig) -> Result<Self> {
        let db = SxGeo::open_with_config(path, db_config)?;
        Ok(Self::new(db, db_config, config))
    }

    /// Create from an in-memory database image with default configuration.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_config(data, CachedConfig::default())
    }

    /// Create from an in-memory database image with custom configuration.
    pub fn from_bytes_with_config(data: &[u8], config: CachedConfig) -> Result<Self> {
        let db = SxGeo::from_bytes(data)?;
        Ok(Self::new(db, SxGeoConfig::memory(), config))
    }

    fn new(db: SxGeo, db_config: SxGeoConfig, config: CachedConfig) -> Self {
        let cache = if config.cache_enabled && config.cache_capacity > 0 {
            Some(Cache::new(config.cache_capacity))
        } else {
            None
        };

        Self {
            inner: ArcSwap::from_pointee(db),
            cache,
            db_config,
            config,
            generation: AtomicU64::new(0),
        }
    }

    /// Hot reload the database from a new file.
    ///
    /// This atomically replaces the underlying reader and clears the cache.
    /// In-flight lookups complete against the old database, new lookups
    /// use the new one. On error the current database stays in place.
    pub fn reload(&self, path: &Path) -> Result<()> {
        let db = SxGeo::open_with_config(path, self.db_config)?;
        self.swap(db);
        log::info!("Hot reloaded database from {:?}", path);
        Ok(())
    }

    /// Hot reload the database from an in-memory image.
    pub fn reload_from_bytes(&self, data: &[u8]) -> Result<()> {
        let db = SxGeo::from_bytes(data)?;
        self.swap(db);
        log::info!("Hot reloaded database from bytes");
        Ok(())
    }

    fn swap(&self, db: SxGeo) {
        self.inner.store(Arc::new(db));

        // Entries keyed by the old generation can no longer be hit
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(ref cache) = self.cache {
            cache.clear();
        }
    }

    /// Full info for an address, consulting the cache first.
    fn lookup(&self, ip: &str) -> Option<Arc<FullInfo>> {
        let ip: Ipv4Addr = ip.parse().ok()?;

        let generation = self.generation();
        let db = self.inner.load();
        let id = db.locate(ip);
        if id == 0 {
            return None;
        }

        let key = (generation, id);

        // Check cache first
        if let Some(ref cache) = self.cache {
            if let Some(result) = cache.get(&key) {
                return result;
            }
        }

        // Cache miss - decode the records
        let result = db.full_info_for_id(id).map(Arc::new);

        if let Some(ref cache) = self.cache {
            cache.insert(key, result.clone());
        }

        result
    }

    /// Clear the cache.
    pub fn clear_cache(&self) {
        if let Some(ref cache) = self.cache {
            cache.clear();
        }
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        if let Some(ref cache) = self.cache {
            CacheStats {
                capacity: self.config.cache_capacity,
                len: cache.len(),
                enabled: true,
            }
        } else {
            CacheStats {
                capacity: 0,
                len: 0,
                enabled: false,
            }
        }
    }

    /// Get the current generation (incremented on each reload).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Get a reference to the underlying reader.
    ///
    /// Note: This is primarily for inspection/debugging. The returned
    /// Arc may become stale after a hot reload.
    pub fn inner(&self) -> arc_swap::Guard<Arc<SxGeo>> {
        self.inner.load()
    }
}

impl GeoLookup for CachedSxGeo {
    fn country_id(&self, ip: &str) -> Option<u32> {
        self.inner.load().country_id(ip)
    }

    fn country_iso(&self, ip: &str) -> Option<String> {
        self.inner.load().country_iso(ip)
    }

    fn full_info(&self, ip: &str) -> Option<FullInfo> {
        self.lookup(ip).map(|info| info.as_ref().clone())
    }

    fn coordinates(&self, ip: &str) -> Option<Coordinates> {
        if !self.inner.load().has_cities() {
            return None;
        }
        self.lookup(ip)?.coordinates()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Maximum cache capacity.
    pub capacity: usize,
    /// Current number of entries in the cache.
    pub len: usize,
    /// Whether caching is enabled.
    pub enabled: bool,
}
