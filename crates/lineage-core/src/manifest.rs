//! Run manifest emitted by `generate` for audit.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;
use crate::id::RevisionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateManifest {
    pub id: ManifestId,

    /// Newest commit walked, if the history was not empty.
    pub head: Option<RevisionId>,

    pub commits_walked: usize,
    pub records_converted: usize,
    pub records_skipped: usize,

    pub plans: usize,
    pub activities: usize,

    /// Stable hashes of the persisted documents.
    pub dependency_digest: Option<Hash256>,
    pub provenance_digest: Option<Hash256>,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl GenerateManifest {
    pub fn new(started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            head: None,
            commits_walked: 0,
            records_converted: 0,
            records_skipped: 0,
            plans: 0,
            activities: 0,
            dependency_digest: None,
            provenance_digest: None,
            engine_version: crate::VERSION.to_string(),
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(
        mut self,
        finished_ms: u64,
        dependency_digest: Hash256,
        provenance_digest: Hash256,
    ) -> Self {
        self.finished_ms = finished_ms.max(self.started_ms);
        self.dependency_digest = Some(dependency_digest);
        self.provenance_digest = Some(provenance_digest);
        self
    }
}

/// Milliseconds since the Unix epoch; `0` if the clock is before it.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
