//! Conductance CLI.
//!
//! Splits vertices into two classes by id parity and reports the ratio of
//! cross-class edges to the smaller class's edge-incidence count, computed
//! in a single edge-stream pass.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use seep::{conductance, DiskGraph, GraphEngine};

/// Compute the parity-split conductance of a disk-resident graph.
#[derive(Debug, Parser)]
#[command(name = "conductance", version)]
struct Args {
    /// Graph directory (as written by seep's GraphWriter).
    path: PathBuf,
    /// Resident memory budget in GiB.
    memory_budget_gib: NonZeroUsize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> seep::Result<()> {
    let mut graph = DiskGraph::open(&args.path)?;
    graph.set_memory_budget(args.memory_budget_gib.get() << 30);

    let start = Instant::now();
    let value = conductance(&graph)?;
    println!("Conductance computed in {:.2} seconds", start.elapsed().as_secs_f64());
    println!("Conductance = {value}");
    Ok(())
}
