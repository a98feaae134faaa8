//! Database open configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::{Error, Result};

/// How record data is fetched after the database is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Seek and read from the open file on every lookup
    #[default]
    File,
    /// Load the range table and record stores into memory, then close the file
    Memory,
    /// Memory-map the whole file
    Mmap,
}

impl StorageMode {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::File => "file",
            StorageMode::Memory => "memory",
            StorageMode::Mmap => "mmap",
        }
    }
}

impl FromStr for StorageMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "file" => Ok(StorageMode::File),
            "memory" | "cache" => Ok(StorageMode::Memory),
            "mmap" => Ok(StorageMode::Mmap),
            other => Err(Error::Config(format!("unknown storage mode: {}", other))),
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for opening a database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SxGeoConfig {
    /// Storage backend used for lookups.
    pub mode: StorageMode,
}

impl SxGeoConfig {
    /// Create a configuration with the given storage mode.
    pub fn with_mode(mode: StorageMode) -> Self {
        Self { mode }
    }

    /// Configuration that loads everything into memory.
    ///
    /// Recommended when one instance serves many threads.
    pub fn memory() -> Self {
        Self::with_mode(StorageMode::Memory)
    }

    /// Configuration that memory-maps the file.
    pub fn mmap() -> Self {
        Self::with_mode(StorageMode::Mmap)
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
