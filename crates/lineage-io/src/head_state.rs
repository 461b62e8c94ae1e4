//! Repository state as of the newest commit of a history.

use lineage_core::id::RevisionId;
use lineage_core::path::normalize;
use lineage_core::provider::{ProviderResult, RepositoryState, RevisionHistory};

pub struct HeadState<H: RevisionHistory> {
    history: H,
    tip: Option<RevisionId>,
}

impl<H: RevisionHistory> HeadState<H> {
    pub fn new(history: H) -> ProviderResult<Self> {
        let tip = history.tip()?;
        Ok(Self { history, tip })
    }

    pub fn tip(&self) -> Option<&RevisionId> {
        self.tip.as_ref()
    }
}

impl<H: RevisionHistory> RepositoryState for HeadState<H> {
    fn current_hash(&self, path: &str) -> ProviderResult<Option<String>> {
        match &self.tip {
            Some(tip) => self.history.content_hash(tip, &normalize(path)),
            None => Ok(None),
        }
    }
}
