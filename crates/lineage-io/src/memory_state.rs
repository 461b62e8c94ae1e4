//! In-memory repository state for testing.

use std::collections::BTreeMap;

use lineage_core::hash::hash_bytes;
use lineage_core::path::normalize;
use lineage_core::provider::{ProviderResult, RepositoryState};

use crate::tree::{self, Snapshot};

/// Current project files, hashed the same way `MemoryHistory` hashes them.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    hashes: Snapshot,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files(files: &BTreeMap<String, Vec<u8>>) -> Self {
        let mut state = Self::new();
        for (path, bytes) in files {
            state.write(path, bytes);
        }
        state
    }

    pub fn write(&mut self, path: &str, content: impl AsRef<[u8]>) {
        self.hashes
            .insert(normalize(path), hash_bytes(content.as_ref()).to_hex());
    }

    pub fn remove(&mut self, path: &str) {
        self.hashes.remove(&normalize(path));
    }
}

impl RepositoryState for MemoryState {
    fn current_hash(&self, path: &str) -> ProviderResult<Option<String>> {
        Ok(tree::hash_at(&self.hashes, &normalize(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_history::MemoryHistory;
    use lineage_core::provider::RevisionHistory;

    #[test]
    fn hashes_agree_with_history() {
        let mut h = MemoryHistory::new();
        let r = h.commit().write("d/a.txt", "x").write("b.txt", "y").finish();
        let mut state = MemoryState::from_files(&h.tip_files());
        assert_eq!(state.current_hash("d").unwrap(), h.content_hash(&r, "d").unwrap());
        assert_eq!(state.current_hash("b.txt").unwrap(), h.hash_of("b.txt", &r));

        state.remove("b.txt");
        assert!(state.current_hash("b.txt").unwrap().is_none());
    }
}
