use std::path::PathBuf;

use thiserror::Error;

use lineage_core::provider::ProviderError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("graphs already exist at {0} (use --force to rebuild)")]
    AlreadyExists(PathBuf),

    #[error("generation cancelled")]
    Cancelled,

    #[error(transparent)]
    Core(#[from] lineage_core::Error),

    #[error(transparent)]
    Io(#[from] lineage_io::Error),
}

impl From<ProviderError> for ExecError {
    fn from(e: ProviderError) -> Self {
        ExecError::Core(e.into())
    }
}
