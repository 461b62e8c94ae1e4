#![forbid(unsafe_code)]
//! lineage-io: everything that touches bytes outside the graphs.
//!
//! - `document`: typed JSON documents for both graphs.
//! - `store`: the on-disk `GraphStore` with an all-or-nothing `save`.
//! - `MemoryHistory` / `MemoryState`: in-memory providers for tests and
//!   benchmarks.
//! - `GitHistory`: a history backed by the `git` binary.
//! - `HeadState`: repository state as of the history tip.

pub mod document;
pub mod error;
pub mod git;
pub mod head_state;
pub mod memory_history;
pub mod memory_state;
pub mod store;
mod tree;

pub use error::{Error, Result};
pub use git::GitHistory;
pub use head_state::HeadState;
pub use memory_history::MemoryHistory;
pub use memory_state::MemoryState;
pub use store::{GraphStore, LoadedGraphs};
