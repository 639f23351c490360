//! Out-of-core streaming substrate.
//!
//! A [`GraphEngine`] owns a disk-resident graph partitioned on disk and
//! dispatches edge/vertex callbacks across worker threads, keeping resident
//! data under a caller-set byte budget. Two rules shape everything built on
//! top of it:
//!
//! - A full edge pass or vertex pass is a **barrier**: no pass observes a
//!   partial result of the previous pass, and no two passes interleave.
//! - Within one pass, callbacks run **concurrently** on different edges or
//!   vertices. Anything an edge callback mutates must use an atomic add,
//!   since multiple edges may target the same vertex at once. Vertex
//!   callbacks touch only their own vertex and need no synchronization.
//!
//! [`DiskGraph`] is the shipped implementation; the algorithms in
//! [`propagate`](crate::propagate) and
//! [`conductance`](mod@crate::conductance) only ever see the trait.

mod atomic;
mod disk_graph;
mod disk_vec;

pub use atomic::fetch_add_f64;
#[cfg(feature = "petgraph")]
pub use disk_graph::write_petgraph;
pub use disk_graph::{DiskGraph, GraphWriter};
pub use disk_vec::{DiskMatrix, DiskVec, Element, Residency};

use std::ops::Range;

use crate::error::Result;

/// Dense vertex identifier in `[0, vertex_count)`.
pub type VertexId = u32;

/// A directed edge between dense vertex ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Edge origin.
    pub source: VertexId,
    /// Edge destination.
    pub target: VertexId,
}

impl Edge {
    /// Width of one on-disk edge record in bytes.
    pub(crate) const WIDTH: usize = 8;

    /// Creates an edge from `source` to `target`.
    pub fn new(source: VertexId, target: VertexId) -> Self {
        Self { source, target }
    }

    pub(crate) fn decode(record: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&record[..4]);
        let source = u32::from_le_bytes(raw);
        raw.copy_from_slice(&record[4..8]);
        let target = u32::from_le_bytes(raw);
        Self { source, target }
    }

    pub(crate) fn encode(self) -> [u8; 8] {
        let mut record = [0u8; 8];
        record[..4].copy_from_slice(&self.source.to_le_bytes());
        record[4..].copy_from_slice(&self.target.to_le_bytes());
        record
    }
}

/// Contract the propagation core needs from the streaming substrate.
pub trait GraphEngine {
    /// Number of vertices; ids are dense in `[0, vertex_count)`.
    fn vertex_count(&self) -> usize;

    /// Streams every directed edge through `visit`, concurrently and in
    /// arbitrary order. Returns the sum of the callbacks' count
    /// contributions (reducers return 1 per matching edge; passes that only
    /// mutate shared state return 0).
    fn stream_edges<F>(&self, visit: F) -> Result<u64>
    where
        F: Fn(Edge) -> u64 + Sync;

    /// Streams every vertex id through `visit`, with `before`/`after`
    /// invoked sequentially around each resident id block, letting a
    /// disk-backed array be loaded for a sub-range and saved afterwards.
    fn stream_vertices_with<F, B, A>(&self, visit: F, before: B, after: A) -> Result<()>
    where
        F: Fn(VertexId) + Sync,
        B: FnMut(Range<VertexId>) -> Result<()>,
        A: FnMut(Range<VertexId>) -> Result<()>;

    /// Streams every vertex id through `visit` with no range hooks.
    fn stream_vertices<F>(&self, visit: F) -> Result<()>
    where
        F: Fn(VertexId) + Sync,
        Self: Sized,
    {
        self.stream_vertices_with(visit, |_| Ok(()), |_| Ok(()))
    }

    /// Caps the bytes the engine keeps resident during a pass.
    fn set_memory_budget(&mut self, bytes: usize);

    /// Tells the engine the total footprint of the per-vertex arrays the
    /// passes will touch, so vertex blocks can be sized to the budget.
    fn set_vertex_data_bytes(&mut self, bytes: usize);

    /// Asks the engine to prioritize `array` for in-memory placement during
    /// the next pass. A performance hint, never a correctness requirement.
    fn hint(&self, array: &dyn Residency) -> Result<()> {
        array.prepare()
    }
}
