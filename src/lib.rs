#![forbid(unsafe_code)]
//! lineage: provenance and dependency tracking for commands recorded in a
//! version-controlled project.
//!
//! This facade re-exports the workspace crates so benches and downstream
//! users can depend on a single package.

pub use lineage_core as core;
pub use lineage_exec as exec;
pub use lineage_graph as graph;
pub use lineage_io as io;
pub use lineage_recon as recon;
