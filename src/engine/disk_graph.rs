//! Disk-resident graph engine.
//!
//! On-disk layout under the graph directory:
//!
//! - `meta` — text header: vertex count and edge count.
//! - `edges` — fixed-width records, one per directed edge: source then
//!   target, both little-endian `u32`.
//!
//! Edge passes stream the record file through a budget-bounded buffer and
//! fan each full buffer out across the rayon pool. Vertex passes split
//! `[0, vertex_count)` into blocks sized so the per-vertex data declared via
//! `set_vertex_data_bytes` fits the budget, running the range hooks
//! sequentially around each block.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::engine::{Edge, GraphEngine, VertexId};
use crate::error::{Error, Result};

const META_FILE: &str = "meta";
const EDGE_FILE: &str = "edges";

/// Streaming engine over a graph directory written by [`GraphWriter`].
pub struct DiskGraph {
    path: PathBuf,
    vertices: usize,
    edges: u64,
    memory_budget: usize,
    vertex_data_bytes: usize,
}

impl DiskGraph {
    /// Resident bytes allowed per pass unless the caller lowers or raises it.
    pub const DEFAULT_MEMORY_BUDGET: usize = 1 << 30;

    /// Opens the graph directory at `path`, validating the header against
    /// the edge file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let header = fs::read_to_string(path.join(META_FILE)).map_err(|err| Error::GraphFormat {
            path: path.clone(),
            message: format!("cannot read header: {err}"),
        })?;
        let mut fields = header.split_whitespace();
        let vertices: usize = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| Error::GraphFormat {
                path: path.clone(),
                message: "header is missing the vertex count".to_string(),
            })?;
        let edges: u64 = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| Error::GraphFormat {
                path: path.clone(),
                message: "header is missing the edge count".to_string(),
            })?;

        let record_bytes = fs::metadata(path.join(EDGE_FILE)).map(|m| m.len()).unwrap_or(0);
        if record_bytes != edges * Edge::WIDTH as u64 {
            return Err(Error::GraphFormat {
                path,
                message: format!(
                    "edge file holds {record_bytes} bytes but the header declares {edges} edges"
                ),
            });
        }

        tracing::debug!(vertices, edges, path = %path.display(), "opened graph");
        Ok(Self {
            path,
            vertices,
            edges,
            memory_budget: Self::DEFAULT_MEMORY_BUDGET,
            vertex_data_bytes: 0,
        })
    }

    /// Graph directory this engine streams from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> u64 {
        self.edges
    }

    /// Streaming buffer size: half the budget, whole records only. The
    /// other half is left to the per-vertex arrays the callbacks touch.
    fn edge_chunk_bytes(&self) -> usize {
        let chunk = (self.memory_budget / 2).max(Edge::WIDTH);
        chunk - chunk % Edge::WIDTH
    }

    /// Vertices per block so the declared per-vertex footprint stays under
    /// the budget.
    fn vertex_block_len(&self) -> usize {
        let per_vertex = (self.vertex_data_bytes / self.vertices.max(1)).max(1);
        (self.memory_budget / per_vertex).clamp(1, self.vertices.max(1))
    }
}

impl GraphEngine for DiskGraph {
    fn vertex_count(&self) -> usize {
        self.vertices
    }

    fn stream_edges<F>(&self, visit: F) -> Result<u64>
    where
        F: Fn(Edge) -> u64 + Sync,
    {
        let mut file = File::open(self.path.join(EDGE_FILE))?;
        let chunk_bytes = self.edge_chunk_bytes();
        let mut buffer = vec![0u8; chunk_bytes.min(self.edges as usize * Edge::WIDTH)];
        let mut remaining = self.edges as usize * Edge::WIDTH;
        let mut total = 0u64;
        while remaining > 0 {
            let take = chunk_bytes.min(remaining);
            let chunk = &mut buffer[..take];
            file.read_exact(chunk)?;
            tracing::trace!(bytes = take, "edge chunk resident");
            total += chunk
                .par_chunks_exact(Edge::WIDTH)
                .map(|record| visit(Edge::decode(record)))
                .sum::<u64>();
            remaining -= take;
        }
        Ok(total)
    }

    fn stream_vertices_with<F, B, A>(&self, visit: F, mut before: B, mut after: A) -> Result<()>
    where
        F: Fn(VertexId) + Sync,
        B: FnMut(Range<VertexId>) -> Result<()>,
        A: FnMut(Range<VertexId>) -> Result<()>,
    {
        let block = self.vertex_block_len();
        let mut start = 0usize;
        while start < self.vertices {
            let end = (start + block).min(self.vertices);
            let range = start as VertexId..end as VertexId;
            before(range.clone())?;
            (start..end).into_par_iter().for_each(|v| visit(v as VertexId));
            after(range)?;
            start = end;
        }
        Ok(())
    }

    fn set_memory_budget(&mut self, bytes: usize) {
        self.memory_budget = bytes.max(Edge::WIDTH);
    }

    fn set_vertex_data_bytes(&mut self, bytes: usize) {
        self.vertex_data_bytes = bytes;
    }
}

/// Writes the on-disk graph layout [`DiskGraph`] streams from.
pub struct GraphWriter {
    out: BufWriter<File>,
    path: PathBuf,
    vertices: usize,
    edges: u64,
}

impl GraphWriter {
    /// Creates the graph directory at `path` for `vertices` dense ids.
    pub fn create(path: impl AsRef<Path>, vertices: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        let out = BufWriter::new(File::create(path.join(EDGE_FILE))?);
        Ok(Self { out, path, vertices, edges: 0 })
    }

    /// Appends one directed edge.
    pub fn push(&mut self, edge: Edge) -> Result<()> {
        let bound = self.vertices;
        if edge.source as usize >= bound || edge.target as usize >= bound {
            return Err(Error::GraphFormat {
                path: self.path.clone(),
                message: format!(
                    "edge {} -> {} references a vertex outside [0, {bound})",
                    edge.source, edge.target
                ),
            });
        }
        self.out.write_all(&edge.encode())?;
        self.edges += 1;
        Ok(())
    }

    /// Flushes the records and writes the header.
    pub fn finish(mut self) -> Result<()> {
        self.out.flush()?;
        fs::write(self.path.join(META_FILE), format!("{} {}\n", self.vertices, self.edges))?;
        Ok(())
    }
}

/// Spills an in-memory petgraph directed graph into the on-disk layout,
/// keeping node indices as dense vertex ids.
#[cfg(feature = "petgraph")]
pub fn write_petgraph<N, E>(
    path: impl AsRef<Path>,
    graph: &petgraph::graph::DiGraph<N, E>,
) -> Result<()> {
    use petgraph::visit::EdgeRef;

    let mut writer = GraphWriter::create(path, graph.node_count())?;
    for edge in graph.edge_references() {
        writer.push(Edge::new(edge.source().index() as VertexId, edge.target().index() as VertexId))?;
    }
    writer.finish()
}
