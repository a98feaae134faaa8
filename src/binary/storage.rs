//! Storage backends serving range-table and record bytes.
//!
//! Every backend answers the same `(store, offset, len)` requests with the
//! same bytes, so lookups behave identically whichever one is selected.

use memmap2::Mmap;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

use super::index::{read_section, Layout};
use crate::config::StorageMode;
use crate::{Error, Result};

/// Data store inside a database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {
    /// Range table
    Ranges,
    /// Region records
    Regions,
    /// Country and city records
    Cities,
}

impl Store {
    pub fn as_str(&self) -> &'static str {
        match self {
            Store::Ranges => "range table",
            Store::Regions => "region store",
            Store::Cities => "city store",
        }
    }
}

/// Byte source for lookups.
pub trait Storage: Send + Sync {
    /// Read up to `len` bytes at `offset` within `store`.
    ///
    /// Requests running past the end of the store return the bytes that
    /// exist; requests starting past the end return an empty slice.
    fn read(&self, store: Store, offset: usize, len: usize) -> Result<Cow<'_, [u8]>>;

    /// The mode this backend implements.
    fn mode(&self) -> StorageMode;
}

/// Clamp a request to a store of `size` bytes.
fn clamp(offset: usize, len: usize, size: usize) -> Range<usize> {
    let start = offset.min(size);
    let end = offset.saturating_add(len).min(size);
    start..end
}

/// Seek-and-read backend over an open file.
///
/// The file handle is shared behind a mutex so a seek and its read are
/// never interleaved with another lookup's.
pub struct FileStorage {
    file: Mutex<File>,
    layout: Layout,
}

impl FileStorage {
    pub fn new(file: File, layout: Layout) -> Self {
        Self {
            file: Mutex::new(file),
            layout,
        }
    }
}

impl Storage for FileStorage {
    fn read(&self, store: Store, offset: usize, len: usize) -> Result<Cow<'_, [u8]>> {
        let (begin, size) = self.layout.section(store);
        let range = clamp(offset, len, size as usize);
        if range.is_empty() {
            return Ok(Cow::Borrowed(&[]));
        }

        let mut buf = vec![0u8; range.len()];
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(begin + range.start as u64))?;
        file.read_exact(&mut buf)?;
        Ok(Cow::Owned(buf))
    }

    fn mode(&self) -> StorageMode {
        StorageMode::File
    }
}

/// Fully cached backend: all stores live in memory.
pub struct MemoryStorage {
    ranges: Vec<u8>,
    regions: Vec<u8>,
    cities: Vec<u8>,
}

impl MemoryStorage {
    /// Read every store from `reader`.
    pub fn load<R: Read + Seek>(reader: &mut R, layout: &Layout) -> Result<Self> {
        reader.seek(SeekFrom::Start(layout.ranges_begin))?;
        let ranges = read_section(reader, layout.ranges_size as usize, Store::Ranges.as_str())?;
        reader.seek(SeekFrom::Start(layout.regions_begin))?;
        let regions = read_section(reader, layout.regions_size as usize, Store::Regions.as_str())?;
        reader.seek(SeekFrom::Start(layout.cities_begin))?;
        let cities = read_section(reader, layout.cities_size as usize, Store::Cities.as_str())?;

        Ok(Self {
            ranges,
            regions,
            cities,
        })
    }

    /// Copy every store out of a complete in-memory file image.
    pub fn from_bytes(data: &[u8], layout: &Layout) -> Result<Self> {
        let section = |store: Store| -> Result<Vec<u8>> {
            let (begin, size) = layout.section(store);
            let (begin, size) = (begin as usize, size as usize);
            data.get(begin..begin + size)
                .map(<[u8]>::to_vec)
                .ok_or(Error::Truncated {
                    section: store.as_str(),
                    expected: begin + size,
                    actual: data.len(),
                })
        };

        Ok(Self {
            ranges: section(Store::Ranges)?,
            regions: section(Store::Regions)?,
            cities: section(Store::Cities)?,
        })
    }

    fn store(&self, store: Store) -> &[u8] {
        match store {
            Store::Ranges => &self.ranges,
            Store::Regions => &self.regions,
            Store::Cities => &self.cities,
        }
    }
}

impl Storage for MemoryStorage {
    fn read(&self, store: Store, offset: usize, len: usize) -> Result<Cow<'_, [u8]>> {
        let data = self.store(store);
        Ok(Cow::Borrowed(&data[clamp(offset, len, data.len())]))
    }

    fn mode(&self) -> StorageMode {
        StorageMode::Memory
    }
}

/// Memory-mapped backend.
pub struct MmapStorage {
    mmap: Mmap,
    layout: Layout,
}

impl MmapStorage {
    /// Map `file`; it must be at least as long as the layout requires.
    pub fn map(file: &File, layout: Layout) -> Result<Self> {
        // The database is treated as immutable once opened.
        let mmap = unsafe { Mmap::map(file)? };
        if (mmap.len() as u64) < layout.end() {
            return Err(Error::Truncated {
                section: "database",
                expected: layout.end() as usize,
                actual: mmap.len(),
            });
        }
        Ok(Self { mmap, layout })
    }
}

impl Storage for MmapStorage {
    fn read(&self, store: Store, offset: usize, len: usize) -> Result<Cow<'_, [u8]>> {
        let (begin, size) = self.layout.section(store);
        let range = clamp(offset, len, size as usize);
        let begin = begin as usize;
        Ok(Cow::Borrowed(
            &self.mmap[begin + range.start..begin + range.end],
        ))
    }

    fn mode(&self) -> StorageMode {
        StorageMode::Mmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    /// 4 bytes of preamble, then ranges(6) regions(3) cities(5).
    fn image() -> (Vec<u8>, Layout) {
        let data: Vec<u8> = (0u8..18).collect();
        let layout = Layout {
            ranges_begin: 4,
            ranges_size: 6,
            regions_begin: 10,
            regions_size: 3,
            cities_begin: 13,
            cities_size: 5,
        };
        (data, layout)
    }

    fn backends() -> Vec<Box<dyn Storage>> {
        let (data, layout) = image();

        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&data).unwrap();

        let mmap = MmapStorage::map(&file, layout).unwrap();
        let memory = MemoryStorage::load(&mut Cursor::new(&data), &layout).unwrap();
        let from_bytes = MemoryStorage::from_bytes(&data, &layout).unwrap();
        let file = FileStorage::new(file, layout);

        vec![
            Box::new(file),
            Box::new(memory),
            Box::new(from_bytes),
            Box::new(mmap),
        ]
    }

    #[test]
    fn test_backends_agree() {
        let requests = [
            (Store::Ranges, 0, 6),
            (Store::Ranges, 2, 2),
            (Store::Regions, 1, 100),
            (Store::Cities, 0, 5),
            (Store::Cities, 4, 1),
            (Store::Cities, 5, 1),
            (Store::Cities, 50, 4),
            (Store::Regions, 0, 0),
        ];
        let backends = backends();
        for (store, offset, len) in requests {
            let expected = backends[1].read(store, offset, len).unwrap().into_owned();
            for backend in &backends {
                let got = backend.read(store, offset, len).unwrap();
                assert_eq!(
                    got.as_ref(),
                    expected.as_slice(),
                    "{} {:?} {} {}",
                    backend.mode(),
                    store,
                    offset,
                    len
                );
            }
        }
    }

    #[test]
    fn test_reads_are_store_relative() {
        let backends = backends();
        for backend in &backends {
            assert_eq!(backend.read(Store::Ranges, 0, 2).unwrap().as_ref(), &[4, 5]);
            assert_eq!(backend.read(Store::Regions, 1, 100).unwrap().as_ref(), &[11, 12]);
            assert_eq!(backend.read(Store::Cities, 3, 2).unwrap().as_ref(), &[16, 17]);
            assert!(backend.read(Store::Cities, 5, 1).unwrap().is_empty());
        }
    }

    #[test]
    fn test_truncated_image_rejected() {
        let (data, layout) = image();
        let short = &data[..15];

        assert!(matches!(
            MemoryStorage::from_bytes(short, &layout),
            Err(Error::Truncated { .. })
        ));
        assert!(matches!(
            MemoryStorage::load(&mut Cursor::new(short), &layout),
            Err(Error::Truncated { section: "city store", .. })
        ));

        let mut file = tempfile::tempfile().unwrap();
        file.write_all(short).unwrap();
        assert!(matches!(
            MmapStorage::map(&file, layout),
            Err(Error::Truncated { section: "database", .. })
        ));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(0, 4, 10), 0..4);
        assert_eq!(clamp(8, 4, 10), 8..10);
        assert_eq!(clamp(12, 4, 10), 10..10);
        assert_eq!(clamp(usize::MAX, 4, 10), 10..10);
    }
}
