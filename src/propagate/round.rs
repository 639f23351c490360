//! One scatter/reduce propagation round.
//!
//! The evidence matrix is the algorithm's memory: one row per vertex, one
//! cell per candidate label. Cells are never reset between rounds, so
//! evidence compounds for the entire run and a vertex that resolves in a
//! late round weighs every contribution scattered since round one.
//! Resetting between rounds would be a different algorithm.

use std::sync::atomic::Ordering;

use crate::engine::{fetch_add_f64, DiskMatrix, DiskVec, GraphEngine};
use crate::error::Result;
use crate::propagate::labels::{LabelStore, UNASSIGNED};

/// Scatter phase: one edge pass pushing evidence from labeled sources
/// toward unlabeled targets.
///
/// For each edge whose source is labeled and whose target is unassigned at
/// the moment of visiting, the source's transition weight is added to the
/// target's evidence cell for the source's label. Edges are visited in
/// arbitrary concurrent order and several may hit the same cell, so the add
/// is atomic. No vertex resolves its own label here: labels are immutable
/// for the whole pass.
pub fn scatter<E: GraphEngine>(
    engine: &E,
    labels: &LabelStore,
    probabilities: &DiskVec<f64>,
    evidence: &DiskMatrix<f64>,
) -> Result<()> {
    let label_cells = labels.atomic();
    let evidence_cells = evidence.atomic_bits();
    let width = evidence.cols();
    engine.stream_edges(|e| {
        let source_label = label_cells[e.source as usize].load(Ordering::Relaxed);
        if source_label != UNASSIGNED
            && label_cells[e.target as usize].load(Ordering::Relaxed) == UNASSIGNED
        {
            let cell = e.target as usize * width + source_label as usize;
            fetch_add_f64(&evidence_cells[cell], probabilities.get(e.source as usize));
        }
        0
    })?;
    Ok(())
}

/// Reduce phase: one vertex pass resolving labels from accumulated
/// evidence. Runs strictly after [`scatter`]; the pass boundary is the
/// barrier separating the phases.
///
/// Each still-unassigned vertex scans its evidence row and takes the argmax
/// under strict greater-than comparisons, so ties resolve to the
/// lowest-indexed label. A vertex with no strictly positive evidence stays
/// unassigned this round. Vertices are independent; the pass needs no
/// cross-vertex synchronization.
pub fn reduce<E: GraphEngine>(
    engine: &E,
    labels: &LabelStore,
    evidence: &DiskMatrix<f64>,
) -> Result<()> {
    let label_cells = labels.atomic();
    let width = evidence.cols();
    engine.stream_vertices(|v| {
        if label_cells[v as usize].load(Ordering::Relaxed) != UNASSIGNED {
            return;
        }
        let mut best = 0.0_f64;
        let mut winner = 0usize;
        for label in 0..width {
            let weight = evidence.get(v as usize, label);
            if weight > best {
                best = weight;
                winner = label;
            }
        }
        if best > 0.0 {
            label_cells[v as usize].store(winner as u32, Ordering::Relaxed);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DiskGraph, Edge, GraphWriter};
    use std::path::Path;

    fn four_cycle(dir: &Path) -> DiskGraph {
        let mut writer = GraphWriter::create(dir, 4).unwrap();
        for v in 0..4u32 {
            writer.push(Edge::new(v, (v + 1) % 4)).unwrap();
        }
        writer.finish().unwrap();
        DiskGraph::open(dir).unwrap()
    }

    struct Fixture {
        labels: LabelStore,
        probabilities: DiskVec<f64>,
        evidence: DiskMatrix<f64>,
    }

    fn fixture(dir: &Path, vertices: usize, labels_num: usize) -> Fixture {
        let labels = LabelStore::create(dir.join("labels"), vertices).unwrap();
        let mut probabilities = DiskVec::<f64>::create(dir.join("prob"), vertices).unwrap();
        probabilities.fill(1.0);
        let evidence = DiskMatrix::<f64>::create(dir.join("evidence"), vertices, labels_num).unwrap();
        Fixture { labels, probabilities, evidence }
    }

    #[test]
    fn test_cycle_round_resolves_neighbors() {
        let dir = tempfile::tempdir().unwrap();
        let graph = four_cycle(&dir.path().join("g"));
        let mut fx = fixture(dir.path(), 4, 2);
        fx.labels.set(0, 0);
        fx.labels.set(2, 1);

        scatter(&graph, &fx.labels, &fx.probabilities, &fx.evidence).unwrap();
        // 0 -> 1 contributes to vertex 1 under label 0; 2 -> 3 under label 1.
        // 1 -> 2 and 3 -> 0 do nothing: their targets are already labeled.
        assert_eq!(fx.evidence.get(1, 0), 1.0);
        assert_eq!(fx.evidence.get(1, 1), 0.0);
        assert_eq!(fx.evidence.get(3, 1), 1.0);
        assert_eq!(fx.evidence.get(3, 0), 0.0);

        reduce(&graph, &fx.labels, &fx.evidence).unwrap();
        assert_eq!(fx.labels.get(1), Some(0));
        assert_eq!(fx.labels.get(3), Some(1));
        assert_eq!(fx.labels.assigned_count(), 4);
    }

    #[test]
    fn test_second_round_changes_nothing_once_assigned() {
        let dir = tempfile::tempdir().unwrap();
        let graph = four_cycle(&dir.path().join("g"));
        let mut fx = fixture(dir.path(), 4, 2);
        fx.labels.set(0, 0);
        fx.labels.set(2, 1);

        for _ in 0..2 {
            scatter(&graph, &fx.labels, &fx.probabilities, &fx.evidence).unwrap();
            reduce(&graph, &fx.labels, &fx.evidence).unwrap();
        }
        assert_eq!(fx.labels.get(0), Some(0));
        assert_eq!(fx.labels.get(1), Some(0));
        assert_eq!(fx.labels.get(2), Some(1));
        assert_eq!(fx.labels.get(3), Some(1));
        // All targets were labeled by round 2, so no further evidence landed.
        assert_eq!(fx.evidence.get(1, 0), 1.0);
        assert_eq!(fx.evidence.get(3, 1), 1.0);
    }

    #[test]
    fn test_evidence_is_monotone_across_rounds() {
        let dir = tempfile::tempdir().unwrap();
        // 0 -> 1 and 2 -> 1: vertex 1 keeps receiving while unassigned, and
        // evidence never decreases from round to round.
        let graph_dir = dir.path().join("g");
        let mut writer = GraphWriter::create(&graph_dir, 3).unwrap();
        writer.push(Edge::new(0, 1)).unwrap();
        writer.push(Edge::new(2, 1)).unwrap();
        writer.finish().unwrap();
        let graph = DiskGraph::open(&graph_dir).unwrap();

        let mut fx = fixture(dir.path(), 3, 2);
        fx.labels.set(0, 0);
        fx.labels.set(2, 1);

        scatter(&graph, &fx.labels, &fx.probabilities, &fx.evidence).unwrap();
        let first = (fx.evidence.get(1, 0), fx.evidence.get(1, 1));
        scatter(&graph, &fx.labels, &fx.probabilities, &fx.evidence).unwrap();
        let second = (fx.evidence.get(1, 0), fx.evidence.get(1, 1));
        assert!(second.0 >= first.0);
        assert!(second.1 >= first.1);
        assert_eq!(second, (2.0, 2.0));
    }

    #[test]
    fn test_tie_breaks_to_lowest_label() {
        let dir = tempfile::tempdir().unwrap();
        let graph_dir = dir.path().join("g");
        let mut writer = GraphWriter::create(&graph_dir, 3).unwrap();
        writer.push(Edge::new(0, 2)).unwrap();
        writer.push(Edge::new(1, 2)).unwrap();
        writer.finish().unwrap();
        let graph = DiskGraph::open(&graph_dir).unwrap();

        let mut fx = fixture(dir.path(), 3, 2);
        // Equal evidence for labels 1 and 0 at vertex 2.
        fx.labels.set(0, 1);
        fx.labels.set(1, 0);

        scatter(&graph, &fx.labels, &fx.probabilities, &fx.evidence).unwrap();
        assert_eq!(fx.evidence.get(2, 0), fx.evidence.get(2, 1));
        reduce(&graph, &fx.labels, &fx.evidence).unwrap();
        assert_eq!(fx.labels.get(2), Some(0));
    }

    #[test]
    fn test_no_positive_evidence_stays_unassigned() {
        let dir = tempfile::tempdir().unwrap();
        let graph = four_cycle(&dir.path().join("g"));
        let fx = fixture(dir.path(), 4, 2);
        // No seeds at all: scatter finds no labeled source.
        scatter(&graph, &fx.labels, &fx.probabilities, &fx.evidence).unwrap();
        reduce(&graph, &fx.labels, &fx.evidence).unwrap();
        assert_eq!(fx.labels.assigned_count(), 0);
    }
}
