use thiserror::Error;

use crate::id::RevisionId;
use crate::provider::ProviderError;

/// Canonical result for core and the crates layered on it.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The graphs would violate a structural invariant (cycle, duplicate id).
    #[error("graph corruption: {0}")]
    GraphCorruption(String),

    #[error("role conflict on entity '{path}' ({checksum}): '{existing}' vs '{requested}'")]
    RoleConflict {
        path: String,
        checksum: String,
        existing: String,
        requested: String,
    },

    /// A root usage/generation could not be pinned to a content hash.
    #[error("cannot resolve '{path}' at revision {revision}: {reason}")]
    Resolution {
        path: String,
        revision: RevisionId,
        reason: String,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid execution record: {0}")]
    Record(String),

    #[error("document error: {0}")]
    Document(String),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}

impl Error {
    /// Whether a batch must abort on this error even when skip-on-error is set.
    ///
    /// Only resolution failures and malformed records are scoped to a single
    /// raw execution; everything else means the graphs or the store are broken.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Resolution { .. } | Error::Record(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Document(e.to_string())
    }
}
