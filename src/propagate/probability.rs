//! Out-degree counting and transition weights.

use std::sync::atomic::Ordering;

use crate::engine::{DiskVec, GraphEngine};
use crate::error::Result;

/// Counts out-degrees with one edge pass: each edge increments its source's
/// counter. Edges are visited concurrently and several may share a source,
/// so the increment is atomic.
pub fn out_degrees<E: GraphEngine>(engine: &E, degrees: &DiskVec<u32>) -> Result<()> {
    let cells = degrees.atomic();
    engine.stream_edges(|e| {
        cells[e.source as usize].fetch_add(1, Ordering::Relaxed);
        0
    })?;
    Ok(())
}

/// Derives the per-vertex transition weight after the degree pass has
/// completed: `1 / out_degree`, or `0` for a vertex with no outgoing edges
/// (a sink is not an error). An independent per-vertex map — no vertex
/// reads another's state.
pub fn transition_probabilities<E: GraphEngine>(
    engine: &E,
    degrees: &DiskVec<u32>,
    probabilities: &DiskVec<f64>,
) -> Result<()> {
    let cells = probabilities.atomic_bits();
    engine.stream_vertices(|v| {
        let degree = degrees.get(v as usize);
        let weight = if degree != 0 { 1.0 / f64::from(degree) } else { 0.0 };
        cells[v as usize].store(weight.to_bits(), Ordering::Relaxed);
    })
}
