//! First-octet index, main index and store layout.

use serde::Serialize;
use std::io::Read;

use super::format::{be_uint, Header, HEADER_SIZE};
use super::storage::Store;
use crate::{Error, Result};

/// Read exactly `len` bytes, reporting a short read as a truncated section.
pub(crate) fn read_section<R: Read>(reader: &mut R, len: usize, section: &'static str) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len);
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(Error::Truncated {
            section,
            expected: len,
            actual: buf.len(),
        });
    }
    Ok(buf)
}

/// Cumulative range-table offsets per first IP octet.
///
/// Entry `i` is the end of the range-table slice for first octet `i`; the
/// slice starts where the previous entry ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstOctetIndex(Vec<u32>);

impl FirstOctetIndex {
    /// Decode big-endian u32 entries, rejecting a decreasing sequence.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let entries: Vec<u32> = raw.chunks_exact(4).map(be_uint).collect();
        if let Some(position) = entries.windows(2).position(|w| w[1] < w[0]) {
            return Err(Error::NonMonotonicIndex {
                position: position + 1,
            });
        }
        Ok(Self(entries))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        self.0.get(i).copied()
    }

    /// Range-table slice `[min, max)` holding addresses with this first octet.
    pub fn block(&self, octet: u8) -> Option<(u32, u32)> {
        let max = self.get(octet as usize)?;
        let min = match octet {
            0 => 0,
            _ => self.get(octet as usize - 1)?,
        };
        Some((min, max))
    }
}

/// Coarse index: one 4-byte IP boundary per `one_index_range` range entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainIndex(Vec<[u8; 4]>);

impl MainIndex {
    pub fn parse(raw: &[u8]) -> Self {
        Self(
            raw.chunks_exact(4)
                .map(|c| [c[0], c[1], c[2], c[3]])
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Find the block to search for `ip` within blocks `[min, max]`.
    ///
    /// Binary search narrows to at most 8 candidates, then a linear scan
    /// moves past every key lower than `ip`. The scan may step one past
    /// `max`, which selects the trailing partial block of a first-octet
    /// slice.
    pub fn search(&self, ip: &[u8; 4], mut min: usize, mut max: usize) -> usize {
        while max > min + 8 {
            let mid = (min + max) >> 1;
            match self.0.get(mid) {
                Some(key) if ip > key => min = mid,
                _ => max = mid,
            }
        }

        while let Some(key) = self.0.get(min) {
            if ip <= key {
                break;
            }
            let last = min >= max;
            min += 1;
            if last {
                break;
            }
        }
        min
    }
}

/// Absolute file offsets and sizes of the data stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub ranges_begin: u64,
    pub ranges_size: u64,
    pub regions_begin: u64,
    pub regions_size: u64,
    pub cities_begin: u64,
    /// Country and city records share one store.
    pub cities_size: u64,
}

impl Layout {
    /// Derive the layout from the header's declared sizes.
    pub fn new(header: &Header) -> Self {
        let ranges_begin = HEADER_SIZE as u64
            + header.pack_format_size as u64
            + header.first_octet_index_count as u64 * 4
            + header.main_index_count as u64 * 4;
        let ranges_size = header.ranges_count as u64 * header.range_entry_len() as u64;
        let regions_begin = ranges_begin + ranges_size;
        let regions_size = header.db_region_length as u64;
        let cities_begin = regions_begin + regions_size;
        let cities_size = header.db_country_length as u64 + header.db_city_length as u64;

        Self {
            ranges_begin,
            ranges_size,
            regions_begin,
            regions_size,
            cities_begin,
            cities_size,
        }
    }

    /// Offset and size of a store.
    pub fn section(&self, store: Store) -> (u64, u64) {
        match store {
            Store::Ranges => (self.ranges_begin, self.ranges_size),
            Store::Regions => (self.regions_begin, self.regions_size),
            Store::Cities => (self.cities_begin, self.cities_size),
        }
    }

    /// Minimum file size implied by the header.
    pub fn end(&self) -> u64 {
        self.cities_begin + self.cities_size
    }
}

/// Load both indexes from a reader positioned right after the pack format.
pub fn load<R: Read>(reader: &mut R, header: &Header) -> Result<(FirstOctetIndex, MainIndex)> {
    let raw = read_section(
        reader,
        header.first_octet_index_count as usize * 4,
        "first octet index",
    )?;
    let first_octet = FirstOctetIndex::parse(&raw)?;

    let raw = read_section(reader, header.main_index_count as usize * 4, "main index")?;
    let main = MainIndex::parse(&raw);

    Ok((first_octet, main))
}
