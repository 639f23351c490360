//! Disk-backed per-vertex arrays.
//!
//! [`DiskVec`] is an addressable mutable sequence of fixed-width elements
//! backed by a memory-mapped file; [`DiskMatrix`] adds a fixed per-element
//! sub-array whose width is chosen at runtime. Both expose `fill`, indexed
//! read/write, `load(range)` for partial residency, and `save` for flushing
//! to the backing file.
//!
//! Residency calls are performance hints, not correctness requirements: the
//! mapping is always addressable, `load` merely asks the OS to bring a range
//! in ahead of a pass that will hammer it.

use std::fs::OpenOptions;
use std::marker::PhantomData;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64};

use memmap2::MmapMut;

use crate::engine::atomic;
use crate::error::{Error, Result};

mod sealed {
    pub trait Sealed {}
    impl Sealed for u32 {}
    impl Sealed for f64 {}
}

/// Fixed-width element of a disk-backed array.
pub trait Element: sealed::Sealed + Copy + Send + Sync + 'static {
    /// Element width in bytes.
    const WIDTH: usize;

    /// Decodes one element from `bytes` (native byte order, scratch data).
    fn decode(bytes: &[u8]) -> Self;

    /// Encodes this element into `bytes`.
    fn encode(self, bytes: &mut [u8]);
}

impl Element for u32 {
    const WIDTH: usize = 4;

    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[..4]);
        u32::from_ne_bytes(raw)
    }

    fn encode(self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_ne_bytes());
    }
}

impl Element for f64 {
    const WIDTH: usize = 8;

    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        f64::from_ne_bytes(raw)
    }

    fn encode(self, bytes: &mut [u8]) {
        bytes[..8].copy_from_slice(&self.to_ne_bytes());
    }
}

/// A disk-backed array that can be prioritized for in-memory residency
/// ahead of a pass. See `GraphEngine::hint`.
pub trait Residency {
    /// Asks the OS to bring the whole array into memory.
    fn prepare(&self) -> Result<()>;
}

/// Mutable fixed-width array backed by a memory-mapped file.
pub struct DiskVec<T: Element> {
    map: MmapMut,
    len: usize,
    path: PathBuf,
    _elem: PhantomData<T>,
}

impl<T: Element> DiskVec<T> {
    /// Creates (or truncates) the backing file at `path`, sized for `len`
    /// elements, zero-filled.
    pub fn create(path: impl AsRef<Path>, len: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if len == 0 {
            return Err(Error::InvalidParameter {
                name: "len",
                message: "disk-backed array cannot be empty".to_string(),
            });
        }
        let bytes = len.checked_mul(T::WIDTH).ok_or_else(|| Error::InvalidParameter {
            name: "len",
            message: format!("array of {len} elements overflows the byte range"),
        })?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(bytes as u64)?;
        // SAFETY: the file was just created with the exact length and stays
        // owned by this value; nothing else maps it.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { map, len, path, _elem: PhantomData })
    }

    /// Maps an existing backing file, validating its size against `len`
    /// elements. Pairs with [`Self::save`] for reopening persisted arrays.
    pub fn open(path: impl AsRef<Path>, len: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if len == 0 {
            return Err(Error::InvalidParameter {
                name: "len",
                message: "disk-backed array cannot be empty".to_string(),
            });
        }
        let bytes = len.checked_mul(T::WIDTH).ok_or_else(|| Error::InvalidParameter {
            name: "len",
            message: format!("array of {len} elements overflows the byte range"),
        })?;
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let actual = file.metadata()?.len();
        if actual != bytes as u64 {
            return Err(Error::GraphFormat {
                path,
                message: format!("backing file holds {actual} bytes, expected {bytes}"),
            });
        }
        // SAFETY: size validated above; the mapping lives as long as this
        // value and the caller is responsible for not mapping it twice.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { map, len, path, _elem: PhantomData })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the array holds no elements. `create` rejects `len == 0`,
    /// so this only exists for the conventional pairing with `len`.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the element at `index`.
    ///
    /// Plain (non-atomic) access: only call while no concurrent pass is
    /// mutating this array.
    pub fn get(&self, index: usize) -> T {
        let offset = index * T::WIDTH;
        T::decode(&self.map[offset..offset + T::WIDTH])
    }

    /// Writes the element at `index`. Plain access, as with [`Self::get`].
    pub fn set(&mut self, index: usize, value: T) {
        let offset = index * T::WIDTH;
        value.encode(&mut self.map[offset..offset + T::WIDTH]);
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: T) {
        for cell in self.map.chunks_exact_mut(T::WIDTH) {
            value.encode(cell);
        }
    }

    /// Asks the OS to bring the element `range` into memory.
    pub fn load(&self, range: Range<usize>) -> Result<()> {
        #[cfg(unix)]
        {
            let offset = range.start * T::WIDTH;
            let bytes = (range.end - range.start) * T::WIDTH;
            if bytes > 0 {
                self.map.advise_range(memmap2::Advice::WillNeed, offset, bytes)?;
            }
        }
        #[cfg(not(unix))]
        let _ = range;
        Ok(())
    }

    /// Flushes the mapped contents to the backing file.
    pub fn save(&self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.map
    }
}

impl DiskVec<u32> {
    /// Atomic view of the cells, for concurrent passes.
    pub fn atomic(&self) -> &[AtomicU32] {
        atomic::u32_cells(self.bytes())
    }
}

impl DiskVec<f64> {
    /// Atomic view of the cells' bit patterns, for concurrent passes.
    /// Combine with [`fetch_add_f64`](crate::engine::fetch_add_f64).
    pub fn atomic_bits(&self) -> &[AtomicU64] {
        atomic::u64_cells(self.bytes())
    }
}

impl<T: Element> Residency for DiskVec<T> {
    fn prepare(&self) -> Result<()> {
        self.load(0..self.len)
    }
}

/// Row-major matrix of fixed-width elements backed by a memory-mapped file.
///
/// The row width is chosen at runtime, so a per-vertex sub-array sized from
/// a runtime parameter never writes past its row.
pub struct DiskMatrix<T: Element> {
    cells: DiskVec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Element> DiskMatrix<T> {
    /// Creates (or truncates) the backing file for `rows * cols` elements.
    pub fn create(path: impl AsRef<Path>, rows: usize, cols: usize) -> Result<Self> {
        if cols == 0 {
            return Err(Error::InvalidParameter {
                name: "cols",
                message: "matrix rows cannot be zero-width".to_string(),
            });
        }
        let len = rows.checked_mul(cols).ok_or_else(|| Error::InvalidParameter {
            name: "rows",
            message: format!("{rows} x {cols} matrix overflows the index range"),
        })?;
        let cells = DiskVec::create(path, len)?;
        Ok(Self { cells, rows, cols })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Row width in elements.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Reads the cell at (`row`, `col`). Plain access; see [`DiskVec::get`].
    pub fn get(&self, row: usize, col: usize) -> T {
        debug_assert!(col < self.cols);
        self.cells.get(row * self.cols + col)
    }

    /// Writes the cell at (`row`, `col`). Plain access.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        debug_assert!(col < self.cols);
        self.cells.set(row * self.cols + col, value);
    }

    /// Sets every cell to `value`.
    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    /// Asks the OS to bring the row `range` into memory.
    pub fn load(&self, rows: Range<usize>) -> Result<()> {
        self.cells.load(rows.start * self.cols..rows.end * self.cols)
    }

    /// Flushes the mapped contents to the backing file.
    pub fn save(&self) -> Result<()> {
        self.cells.save()
    }
}

impl DiskMatrix<f64> {
    /// Atomic view of all cells in row-major order; the cell (`row`, `col`)
    /// lives at `row * cols() + col`.
    pub fn atomic_bits(&self) -> &[AtomicU64] {
        self.cells.atomic_bits()
    }
}

impl<T: Element> Residency for DiskMatrix<T> {
    fn prepare(&self) -> Result<()> {
        self.cells.prepare()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_disk_vec_fill_get_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut v = DiskVec::<u32>::create(dir.path().join("cells"), 16).unwrap();
        v.fill(7);
        assert_eq!(v.get(0), 7);
        assert_eq!(v.get(15), 7);
        v.set(3, 42);
        assert_eq!(v.get(3), 42);
        assert_eq!(v.get(4), 7);
    }

    #[test]
    fn test_disk_vec_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DiskVec::<f64>::create(dir.path().join("cells"), 0).is_err());
    }

    #[test]
    fn test_disk_vec_save_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells");
        {
            let mut v = DiskVec::<f64>::create(&path, 4).unwrap();
            v.set(2, 0.5);
            v.save().unwrap();
        }
        let raw = std::fs::read(&path).unwrap();
        assert_eq!(raw.len(), 32);
        let mut bits = [0u8; 8];
        bits.copy_from_slice(&raw[16..24]);
        assert_eq!(f64::from_ne_bytes(bits), 0.5);
    }

    #[test]
    fn test_atomic_view_aliases_cells() {
        let dir = tempfile::tempdir().unwrap();
        let v = DiskVec::<u32>::create(dir.path().join("cells"), 8).unwrap();
        v.atomic()[5].store(9, Ordering::Relaxed);
        assert_eq!(v.get(5), 9);
    }

    #[test]
    fn test_matrix_runtime_width() {
        let dir = tempfile::tempdir().unwrap();
        // More columns than rows: sizing comes from the runtime width, and
        // the last cell of the last row is addressable.
        let mut m = DiskMatrix::<f64>::create(dir.path().join("grid"), 2, 9).unwrap();
        m.set(1, 8, 3.5);
        assert_eq!(m.get(1, 8), 3.5);
        assert_eq!(m.get(0, 8), 0.0);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 9);
    }

    #[test]
    fn test_matrix_atomic_add() {
        let dir = tempfile::tempdir().unwrap();
        let m = DiskMatrix::<f64>::create(dir.path().join("grid"), 3, 4).unwrap();
        let cells = m.atomic_bits();
        atomic::fetch_add_f64(&cells[2 * 4 + 1], 0.25);
        atomic::fetch_add_f64(&cells[2 * 4 + 1], 0.25);
        assert_eq!(m.get(2, 1), 0.5);
    }

    #[test]
    fn test_load_is_advisory() {
        let dir = tempfile::tempdir().unwrap();
        let v = DiskVec::<u32>::create(dir.path().join("cells"), 64).unwrap();
        v.load(0..64).unwrap();
        v.load(10..10).unwrap();
    }
}
