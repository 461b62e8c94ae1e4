//! Interfaces to the outside world: the revision history a project lives in,
//! and the current state of its working tree.
//!
//! Both are consumed, never implemented, by the graph and reconciliation
//! code. `lineage-io` ships in-memory and `git`-backed implementations.

use thiserror::Error;

use crate::id::RevisionId;

/// A lookup against the history or repository failed for a reason other
/// than "not found" (which is `Ok(None)` everywhere).
#[derive(Debug, Clone, Error)]
#[error("{op}: {message}")]
pub struct ProviderError {
    pub op: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(op: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            message: message.into(),
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: String,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub revision: RevisionId,
    pub parent: Option<RevisionId>,
    /// Commit time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

/// One directory entry as seen at a revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub is_dir: bool,
}

/// Read access to a linear project history.
///
/// Paths are project-relative and normalized.
pub trait RevisionHistory {
    /// Commits oldest-first. `since` is exclusive: only commits after it are
    /// yielded.
    fn commits(&self, since: Option<&RevisionId>) -> ProviderResult<Vec<Commit>>;

    /// Paths changed by `revision` relative to its parent.
    fn changes(&self, revision: &RevisionId) -> ProviderResult<Vec<Change>>;

    /// Content hash of `path` as it exists at `revision`, or `None` when the
    /// path does not exist there.
    fn content_hash(&self, revision: &RevisionId, path: &str) -> ProviderResult<Option<String>>;

    /// The nearest revision at or before `revision` that touched `path`.
    fn previous_revision(
        &self,
        path: &str,
        revision: &RevisionId,
    ) -> ProviderResult<Option<RevisionId>>;

    fn parent(&self, revision: &RevisionId) -> ProviderResult<Option<RevisionId>>;

    /// Whether `ancestor` is `descendant` or one of its ancestors.
    fn is_ancestor(&self, ancestor: &RevisionId, descendant: &RevisionId) -> ProviderResult<bool>;

    /// Direct entries of the directory `dir` at `revision`; `None` when `dir`
    /// is not a directory there.
    fn children(&self, revision: &RevisionId, dir: &str) -> ProviderResult<Option<Vec<TreeEntry>>>;

    /// Raw bytes of `path` at `revision`.
    fn read(&self, revision: &RevisionId, path: &str) -> ProviderResult<Option<Vec<u8>>>;

    /// The newest commit, if any.
    fn tip(&self) -> ProviderResult<Option<RevisionId>>;
}

/// The project as it is right now.
pub trait RepositoryState {
    /// Current content hash of `path`; `None` when it is missing or deleted.
    fn current_hash(&self, path: &str) -> ProviderResult<Option<String>>;
}

impl<T: RevisionHistory + ?Sized> RevisionHistory for &T {
    fn commits(&self, since: Option<&RevisionId>) -> ProviderResult<Vec<Commit>> {
        (**self).commits(since)
    }
    fn changes(&self, revision: &RevisionId) -> ProviderResult<Vec<Change>> {
        (**self).changes(revision)
    }
    fn content_hash(&self, revision: &RevisionId, path: &str) -> ProviderResult<Option<String>> {
        (**self).content_hash(revision, path)
    }
    fn previous_revision(
        &self,
        path: &str,
        revision: &RevisionId,
    ) -> ProviderResult<Option<RevisionId>> {
        (**self).previous_revision(path, revision)
    }
    fn parent(&self, revision: &RevisionId) -> ProviderResult<Option<RevisionId>> {
        (**self).parent(revision)
    }
    fn is_ancestor(&self, ancestor: &RevisionId, descendant: &RevisionId) -> ProviderResult<bool> {
        (**self).is_ancestor(ancestor, descendant)
    }
    fn children(&self, revision: &RevisionId, dir: &str) -> ProviderResult<Option<Vec<TreeEntry>>> {
        (**self).children(revision, dir)
    }
    fn read(&self, revision: &RevisionId, path: &str) -> ProviderResult<Option<Vec<u8>>> {
        (**self).read(revision, path)
    }
    fn tip(&self) -> ProviderResult<Option<RevisionId>> {
        (**self).tip()
    }
}
