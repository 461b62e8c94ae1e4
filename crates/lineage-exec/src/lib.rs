#![forbid(unsafe_code)]
//! lineage-exec: the query surface over a project.
//!
//! - `generate`: replay history oldest-first, convert every raw record and
//!   persist both graphs in one step.
//! - `status`: compare recorded state with the repository and propagate
//!   changes through the dependency graph.
//! - `ProgressSink` and `CancelToken` are passed in by the caller.

pub mod error;
pub mod generate;
pub mod progress;
pub mod project;
pub mod status;

pub use error::ExecError;
pub use generate::{generate, CancelToken, GenerateOptions};
pub use progress::{NoopProgress, ProgressEvent, ProgressSink, TracingProgress};
pub use project::Project;
pub use status::{status, StatusReport};
