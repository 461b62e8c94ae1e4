use std::path::PathBuf;

use thiserror::Error;

/// Result type local to lineage-io.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] lineage_core::Error),

    #[error("malformed graph document: {0}")]
    Document(String),

    #[error("no graphs found under {0}")]
    MissingGraphs(PathBuf),
}
