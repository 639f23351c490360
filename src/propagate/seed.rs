//! Initial label placement.

use rand::{Rng, RngCore};

use crate::propagate::labels::LabelStore;

/// Seeds the label array: every vertex is reset to unassigned, then
/// `labels_num` vertices are drawn uniformly from `[0, vertex_count)` and
/// the i-th draw is labeled `i`, in draw order.
///
/// Draws are deliberately not deduplicated: when two draws land on the same
/// vertex the later draw's label silently overwrites the earlier one, so
/// fewer than `labels_num` distinct vertices may end up seeded. At most
/// `labels_num` vertices carry a label afterwards; all others stay
/// unassigned.
///
/// The generator is injected rather than global so runs can be reproduced.
pub fn seed_labels(labels: &mut LabelStore, labels_num: usize, rng: &mut dyn RngCore) {
    labels.reset();
    let vertices = labels.len();
    for label in 0..labels_num {
        let draw = rng.random_range(0..vertices);
        labels.set(draw, label as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_at_most_labels_num_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let mut labels = LabelStore::create(dir.path().join("labels"), 100).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        seed_labels(&mut labels, 5, &mut rng);
        assert!(labels.assigned_count() <= 5);
        for v in 0..100 {
            if let Some(label) = labels.get(v) {
                assert!(label < 5);
            }
        }
    }

    #[test]
    fn test_collisions_leave_fewer_seeds() {
        let dir = tempfile::tempdir().unwrap();
        // One vertex: all draws collide and the last draw wins.
        let mut labels = LabelStore::create(dir.path().join("labels"), 1).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        seed_labels(&mut labels, 4, &mut rng);
        assert_eq!(labels.assigned_count(), 1);
        assert_eq!(labels.get(0), Some(3));
    }

    #[test]
    fn test_same_seed_same_placement() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = LabelStore::create(dir.path().join("a"), 64).unwrap();
        let mut b = LabelStore::create(dir.path().join("b"), 64).unwrap();
        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        seed_labels(&mut a, 8, &mut rng_a);
        seed_labels(&mut b, 8, &mut rng_b);
        for v in 0..64 {
            assert_eq!(a.get(v), b.get(v));
        }
    }

    #[test]
    fn test_reseeding_clears_previous_labels() {
        let dir = tempfile::tempdir().unwrap();
        let mut labels = LabelStore::create(dir.path().join("labels"), 16).unwrap();
        labels.set(9, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        seed_labels(&mut labels, 2, &mut rng);
        assert!(labels.assigned_count() <= 2);
    }
}
