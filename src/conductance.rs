//! Graph conductance over a fixed vertex-parity split.
//!
//! A single-pass reducer on the same engine contract the propagation core
//! uses: vertices are split into two classes by id parity, one edge stream
//! counts each class's edge incidences (by source) and, through the pass's
//! count contribution, the edges that cross the split. The reported value is
//! `crossings / min(odd_incidences, even_incidences)`.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::{GraphEngine, VertexId};
use crate::error::{Error, Result};

fn is_odd(v: VertexId) -> bool {
    v % 2 == 1
}

/// Computes the parity-split conductance with one edge pass.
///
/// Returns [`Error::EmptyInput`] when the smaller class has no edge
/// incidences (the ratio would be undefined).
pub fn conductance<E: GraphEngine>(engine: &E) -> Result<f64> {
    let odd_incidences = AtomicU64::new(0);
    let even_incidences = AtomicU64::new(0);

    let crossings = engine.stream_edges(|e| {
        if is_odd(e.source) {
            odd_incidences.fetch_add(1, Ordering::Relaxed);
            u64::from(!is_odd(e.target))
        } else {
            even_incidences.fetch_add(1, Ordering::Relaxed);
            u64::from(is_odd(e.target))
        }
    })?;

    let smaller = odd_incidences
        .load(Ordering::Relaxed)
        .min(even_incidences.load(Ordering::Relaxed));
    if smaller == 0 {
        return Err(Error::EmptyInput);
    }
    Ok(crossings as f64 / smaller as f64)
}
