#![forbid(unsafe_code)]
//! lineage-core: the value model shared by every lineage crate.
//!
//! - Strongly-typed ids and content-addressed URIs.
//! - `Entity`/`Collection` references held in a per-activity arena.
//! - `Plan` recipe templates with structural similarity.
//! - `Activity` records with role-qualified usages and generations.
//! - Traits for the external revision-history and repository-state providers.
//!
//! No graph algorithms and no I/O live here; `lineage-graph` and `lineage-io`
//! build on top of these types.

pub mod activity;
pub mod config;
pub mod entity;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod path;
pub mod plan;
pub mod prelude;
pub mod provider;
pub mod uri;

pub use error::{Error, Result};

/// Engine version recorded into manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
