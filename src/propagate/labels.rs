//! Per-vertex label state.

use std::ops::Range;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::engine::{DiskVec, GraphEngine, Residency, VertexId};
use crate::error::Result;

/// Sentinel meaning "no community label yet".
pub const UNASSIGNED: u32 = u32::MAX;

/// Disk-backed label assignment, one `u32` per vertex: either a label in
/// `[0, labels_num)` or [`UNASSIGNED`].
///
/// Seeding writes labels first and may overwrite other seeds; after that,
/// only the reduce phase writes, and it only ever touches vertices that are
/// still unassigned — a defined label is never overwritten.
pub struct LabelStore {
    cells: DiskVec<u32>,
}

impl LabelStore {
    /// Creates the backing array with every vertex unassigned.
    pub fn create(path: impl AsRef<Path>, vertices: usize) -> Result<Self> {
        let mut cells = DiskVec::create(path, vertices)?;
        cells.fill(UNASSIGNED);
        Ok(Self { cells })
    }

    /// Maps a previously persisted label array without resetting it.
    pub fn open(path: impl AsRef<Path>, vertices: usize) -> Result<Self> {
        Ok(Self { cells: DiskVec::open(path, vertices)? })
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if the store covers no vertices.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Resets every vertex to [`UNASSIGNED`].
    pub fn reset(&mut self) {
        self.cells.fill(UNASSIGNED);
    }

    /// Label of `vertex`, or `None` while unassigned.
    pub fn get(&self, vertex: usize) -> Option<u32> {
        let raw = self.cells.get(vertex);
        (raw != UNASSIGNED).then_some(raw)
    }

    /// Unconditionally writes `label`. Seeding relies on this: a later seed
    /// draw landing on the same vertex silently wins.
    pub fn set(&mut self, vertex: usize, label: u32) {
        self.cells.set(vertex, label);
    }

    /// Atomic view for concurrent passes.
    pub fn atomic(&self) -> &[AtomicU32] {
        self.cells.atomic()
    }

    /// Count of vertices with a defined label.
    pub fn assigned_count(&self) -> u64 {
        (0..self.cells.len()).filter(|&v| self.get(v).is_some()).count() as u64
    }

    /// Brings the label cells for `vertices` into memory.
    pub fn load(&self, vertices: Range<usize>) -> Result<()> {
        self.cells.load(vertices)
    }

    /// Flushes the label cells to the backing file.
    pub fn save(&self) -> Result<()> {
        self.cells.save()
    }
}

impl Residency for LabelStore {
    fn prepare(&self) -> Result<()> {
        self.cells.prepare()
    }
}

/// Counts the vertices holding each label with one engine pass.
///
/// Unassigned vertices are excluded from every count, so the counts sum to
/// at most the vertex count, with equality exactly when no vertex is left
/// unassigned.
pub fn frequency_histogram<E: GraphEngine>(
    engine: &E,
    labels: &LabelStore,
    labels_num: usize,
) -> Result<Vec<u64>> {
    let counts: Vec<AtomicU64> = (0..labels_num).map(|_| AtomicU64::new(0)).collect();
    let cells = labels.atomic();
    engine.stream_vertices(|v: VertexId| {
        let label = cells[v as usize].load(Ordering::Relaxed);
        if label != UNASSIGNED {
            counts[label as usize].fetch_add(1, Ordering::Relaxed);
        }
    })?;
    Ok(counts.into_iter().map(AtomicU64::into_inner).collect())
}
