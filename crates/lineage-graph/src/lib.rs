#![forbid(unsafe_code)]
//! lineage-graph: the two coupled graphs.
//!
//! - `DependencyGraph`: Plans as nodes, path-containment edges, kept acyclic.
//! - `ProvenanceGraph`: ordered Activities with per-path latest-state indexes.
//! - `verify`: cycle detection shared by both and by tests.

pub mod dependency;
pub mod provenance;
pub mod verify;

pub use dependency::DependencyGraph;
pub use provenance::{ChangeSet, LatestState, ProvenanceGraph};
