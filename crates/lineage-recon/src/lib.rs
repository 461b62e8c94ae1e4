#![forbid(unsafe_code)]
//! lineage-recon: from raw execution records to canonical Activities.
//!
//! - `raw`: the YAML record DSL written by a run (approximate revisions).
//! - `resolve`: pins each reference to an exact revision and content hash,
//!   expanding directories under a `TemporalFilter`.
//! - `convert`: the `Reconciler`, which resolves a whole record before
//!   registering any Plan.

pub mod convert;
pub mod raw;
pub mod resolve;

pub use convert::{Conversion, Diagnostic, Reconciler, RecordContext};
pub use raw::{parse_record, RawRecord, RawReference, RawRun};
pub use resolve::{Resolver, TemporalFilter};
