//! Three-tier IP → record id search.
//!
//! 1. The first-octet index pins the range-table slice for the first byte.
//! 2. Slices larger than one main-index block are narrowed to a single block
//!    through the main index.
//! 3. The block is searched on the remaining 3 bytes of the address.

use std::net::Ipv4Addr;

use super::format::{be_uint, Header, RESERVED_OCTETS};
use super::index::{FirstOctetIndex, MainIndex};
use super::storage::{Storage, Store};
use crate::Result;

/// Locates the range-table id for an address.
#[derive(Debug, Clone)]
pub struct RangeLocator {
    first_octet: FirstOctetIndex,
    main: MainIndex,
    first_octet_count: u8,
    main_index_count: u64,
    one_index_range: u64,
    ranges_count: u64,
    id_length: usize,
}

impl RangeLocator {
    pub fn new(header: &Header, first_octet: FirstOctetIndex, main: MainIndex) -> Self {
        Self {
            first_octet,
            main,
            first_octet_count: header.first_octet_index_count,
            main_index_count: header.main_index_count as u64,
            one_index_range: header.one_index_range as u64,
            ranges_count: header.ranges_count as u64,
            id_length: header.id_length as usize,
        }
    }

    /// Range-table entries `[min, max)` that can hold `ip`.
    ///
    /// Returns `None` for reserved first octets and octets the database
    /// does not cover.
    pub fn bounds(&self, ip: Ipv4Addr) -> Option<(u64, u64)> {
        let octets = ip.octets();
        let first = octets[0];
        if RESERVED_OCTETS.contains(&first) || first >= self.first_octet_count {
            return None;
        }

        let (block_min, block_max) = self.first_octet.block(first)?;
        let (block_min, block_max) = (block_min as u64, block_max as u64);
        let range = self.one_index_range;

        if block_max.saturating_sub(block_min) <= range {
            return Some((block_min, block_max));
        }

        let part = self.main.search(
            &octets,
            (block_min / range) as usize,
            (block_max / range).saturating_sub(1) as usize,
        ) as u64;

        let min = if part > 0 { part * range } else { 0 };
        let max = if part > self.main_index_count {
            self.ranges_count
        } else {
            (part + 1) * range
        };

        Some((min.max(block_min), max.min(block_max)))
    }

    /// Find the record id for `ip`; 0 means no data.
    pub fn locate(&self, ip: Ipv4Addr, storage: &dyn Storage) -> Result<u32> {
        let Some((min, max)) = self.bounds(ip) else {
            return Ok(0);
        };
        let count = max.saturating_sub(min) as usize;
        let entry_len = self.id_length + 3;

        let table = storage.read(Store::Ranges, min as usize * entry_len, count * entry_len)?;
        let octets = ip.octets();
        Ok(search_range_table(
            &table,
            &[octets[1], octets[2], octets[3]],
            self.id_length,
        ))
    }
}

/// Search a range-table slice for the entry covering `ip`.
///
/// Entries are `(3-byte boundary, id)` in ascending boundary order; the
/// covering entry is the last one whose boundary is `<= ip`. Returns its
/// big-endian id, or 0 when `ip` precedes every boundary in the slice.
///
/// A probe equal to a boundary keeps that boundary in the window, so an
/// address that starts a range always resolves to that range.
pub fn search_range_table(table: &[u8], ip: &[u8; 3], id_length: usize) -> u32 {
    let entry_len = id_length + 3;
    let key = |i: usize| table.get(i * entry_len..i * entry_len + 3);

    let mut min = 0usize;
    let mut max = table.len() / entry_len;

    if max - min > 1 {
        while max - min > 8 {
            let mid = (min + max) >> 1;
            match key(mid) {
                Some(k) if ip.as_slice() >= k => min = mid,
                _ => max = mid,
            }
        }

        while matches!(key(min), Some(k) if ip.as_slice() >= k) {
            min += 1;
            if min >= max {
                break;
            }
        }
    } else {
        min += 1;
    }

    // The id of entry `min - 1` ends where entry `min` begins.
    let end = min * entry_len;
    end.checked_sub(id_length)
        .and_then(|start| table.get(start..end))
        .map_or(0, be_uint)
}
