//! Atomic views over mapped byte ranges.
//!
//! Edge callbacks run concurrently and may target the same vertex, so any
//! state they mutate (degree counters, evidence cells) goes through atomics.
//! Vertex callbacks own their vertex and use plain stores via the same views.
//!
//! All operations use `Ordering::Relaxed`: passes are separated by barriers
//! (the worker pool joins before a pass returns), so cross-pass visibility is
//! established by thread joins, not by per-cell ordering.

use std::mem::align_of;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Reinterprets a mapped byte region as atomic `u32` cells.
///
/// # Panics
///
/// Panics if `bytes` is not 4-byte aligned or not a whole number of cells.
/// Memory maps are page aligned, so views taken at element offsets hold this.
pub(crate) fn u32_cells(bytes: &[u8]) -> &[AtomicU32] {
    assert_eq!(bytes.len() % 4, 0, "byte length not a multiple of 4");
    assert_eq!(bytes.as_ptr() as usize % align_of::<AtomicU32>(), 0, "unaligned view");
    // SAFETY: `AtomicU32` has the same size and layout as `u32`; the region
    // belongs to a writable mapping that outlives the returned slice, and
    // every concurrent mutation of it goes through these atomics.
    unsafe { std::slice::from_raw_parts(bytes.as_ptr().cast::<AtomicU32>(), bytes.len() / 4) }
}

/// Reinterprets a mapped byte region as atomic 64-bit cells.
///
/// `f64` cells are accessed through their bit patterns; see [`fetch_add_f64`].
///
/// # Panics
///
/// Panics if `bytes` is not 8-byte aligned or not a whole number of cells.
pub(crate) fn u64_cells(bytes: &[u8]) -> &[AtomicU64] {
    assert_eq!(bytes.len() % 8, 0, "byte length not a multiple of 8");
    assert_eq!(bytes.as_ptr() as usize % align_of::<AtomicU64>(), 0, "unaligned view");
    // SAFETY: as in `u32_cells`, with 8-byte cells.
    unsafe { std::slice::from_raw_parts(bytes.as_ptr().cast::<AtomicU64>(), bytes.len() / 8) }
}

/// Atomically adds `delta` to an `f64` cell stored as its bit pattern.
///
/// Compare-and-swap loop: concurrent adds to the same cell never lose an
/// update, though their order is unspecified.
pub fn fetch_add_f64(cell: &AtomicU64, delta: f64) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = (f64::from_bits(current) + delta).to_bits();
        match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}
