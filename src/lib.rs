//! # seep
//!
//! Out-of-core community detection: asynchronous label propagation over
//! disk-resident graphs, plus a conductance reducer sharing the same
//! streaming engine.
//!
//! The graph never has to fit in memory. An [`engine`] streams edges and
//! vertices from disk in budget-bounded blocks across worker threads, and
//! the [`propagate`] core runs as pure scatter/reduce passes over
//! disk-backed per-vertex arrays: seed a few labels, push evidence along
//! edges, let undecided vertices adopt the strongest accumulated label,
//! repeat for a fixed number of rounds.
//!
//! ## Layout
//!
//! - [`engine`] — streaming substrate: the [`GraphEngine`] contract, the
//!   shipped [`DiskGraph`] implementation, and the disk-backed arrays
//!   ([`DiskVec`], [`DiskMatrix`]).
//! - [`propagate`] — the algorithm: seeding, transition weights, the
//!   scatter/reduce round, and the [`Propagation`] runner.
//! - [`conductance`](mod@conductance) — single-pass parity-split
//!   conductance.
//!
//! Two binaries (`community`, `conductance`) wrap the library for the
//! command line.

pub mod conductance;
pub mod engine;
/// Error types used across `seep`.
pub mod error;
pub mod propagate;

pub use conductance::conductance;
pub use engine::{
    DiskGraph, DiskMatrix, DiskVec, Edge, GraphEngine, GraphWriter, Residency, VertexId,
};
pub use error::{Error, Result};
pub use propagate::{LabelStore, Propagation, Summary, Timings, UNASSIGNED};
