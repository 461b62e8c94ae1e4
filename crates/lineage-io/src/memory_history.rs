//! In-memory linear history for testing.
//!
//! Every commit keeps a full snapshot of the project, so lookups at any
//! revision are map reads. Content hashes are blake3 over file bytes;
//! directory hashes are derived from their members.

use std::collections::{BTreeMap, HashMap};

use lineage_core::hash::{hash_bytes, hash_str};
use lineage_core::id::RevisionId;
use lineage_core::path::{contains, normalize, ContainmentPolicy};
use lineage_core::provider::{
    Change, ChangeKind, Commit, ProviderError, ProviderResult, RevisionHistory, TreeEntry,
};

use crate::tree::{self, Snapshot};

#[derive(Debug, Clone)]
struct MemCommit {
    commit: Commit,
    changes: Vec<Change>,
    hashes: Snapshot,
    contents: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    commits: Vec<MemCommit>,
    by_rev: HashMap<RevisionId, usize>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a commit on top of the current tip.
    pub fn commit(&mut self) -> CommitBuilder<'_> {
        CommitBuilder {
            history: self,
            ops: Vec::new(),
            timestamp_ms: None,
        }
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Content hash of `path` at `revision`, for assertions.
    pub fn hash_of(&self, path: &str, revision: &RevisionId) -> Option<String> {
        self.content_hash(revision, path).ok().flatten()
    }

    /// Snapshot of file contents at the tip.
    pub fn tip_files(&self) -> BTreeMap<String, Vec<u8>> {
        self.commits
            .last()
            .map(|c| c.contents.clone())
            .unwrap_or_default()
    }

    fn at(&self, op: &str, revision: &RevisionId) -> ProviderResult<&MemCommit> {
        self.by_rev
            .get(revision)
            .map(|&i| &self.commits[i])
            .ok_or_else(|| ProviderError::new(op, format!("unknown revision {revision}")))
    }

    fn position(&self, op: &str, revision: &RevisionId) -> ProviderResult<usize> {
        self.by_rev
            .get(revision)
            .copied()
            .ok_or_else(|| ProviderError::new(op, format!("unknown revision {revision}")))
    }
}

enum Op {
    Write(String, Vec<u8>),
    Delete(String),
}

pub struct CommitBuilder<'a> {
    history: &'a mut MemoryHistory,
    ops: Vec<Op>,
    timestamp_ms: Option<u64>,
}

impl<'a> CommitBuilder<'a> {
    pub fn write(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.ops
            .push(Op::Write(normalize(path), content.as_ref().to_vec()));
        self
    }

    /// Delete a file, or every file below a directory.
    pub fn delete(mut self, path: &str) -> Self {
        self.ops.push(Op::Delete(normalize(path)));
        self
    }

    pub fn at(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn finish(self) -> RevisionId {
        let history = self.history;
        let position = history.commits.len();
        let parent = history.commits.last();
        let mut hashes = parent.map(|c| c.hashes.clone()).unwrap_or_default();
        let mut contents = parent.map(|c| c.contents.clone()).unwrap_or_default();
        let parent_rev = parent.map(|c| c.commit.revision.clone());

        let mut changes: BTreeMap<String, ChangeKind> = BTreeMap::new();
        for op in self.ops {
            match op {
                Op::Write(path, bytes) => {
                    let kind = match changes.get(&path) {
                        Some(ChangeKind::Added) => ChangeKind::Added,
                        _ if hashes.contains_key(&path) => ChangeKind::Modified,
                        _ => ChangeKind::Added,
                    };
                    hashes.insert(path.clone(), hash_bytes(&bytes).to_hex());
                    contents.insert(path.clone(), bytes);
                    changes.insert(path, kind);
                }
                Op::Delete(path) => {
                    let doomed: Vec<String> = hashes
                        .keys()
                        .filter(|p| contains(&path, p, ContainmentPolicy::Ancestor))
                        .cloned()
                        .collect();
                    for p in doomed {
                        hashes.remove(&p);
                        contents.remove(&p);
                        if changes.get(&p) == Some(&ChangeKind::Added) {
                            changes.remove(&p);
                        } else {
                            changes.insert(p, ChangeKind::Deleted);
                        }
                    }
                }
            }
        }

        let seed = format!(
            "{}:{}:{:?}",
            position,
            parent_rev.as_ref().map(|r| r.as_str()).unwrap_or(""),
            changes
        );
        let revision = RevisionId::new(&hash_str(&seed).to_hex()[..40]);
        let timestamp_ms = self
            .timestamp_ms
            .unwrap_or((position as u64 + 1) * 1_000);

        history.by_rev.insert(revision.clone(), position);
        history.commits.push(MemCommit {
            commit: Commit {
                revision: revision.clone(),
                parent: parent_rev,
                timestamp_ms,
            },
            changes: changes
                .into_iter()
                .map(|(path, kind)| Change { path, kind })
                .collect(),
            hashes,
            contents,
        });
        revision
    }
}

impl RevisionHistory for MemoryHistory {
    fn commits(&self, since: Option<&RevisionId>) -> ProviderResult<Vec<Commit>> {
        let start = match since {
            Some(rev) => self.position("commits", rev)? + 1,
            None => 0,
        };
        Ok(self.commits[start..].iter().map(|c| c.commit.clone()).collect())
    }

    fn changes(&self, revision: &RevisionId) -> ProviderResult<Vec<Change>> {
        Ok(self.at("changes", revision)?.changes.clone())
    }

    fn content_hash(&self, revision: &RevisionId, path: &str) -> ProviderResult<Option<String>> {
        let commit = self.at("content_hash", revision)?;
        Ok(tree::hash_at(&commit.hashes, &normalize(path)))
    }

    fn previous_revision(
        &self,
        path: &str,
        revision: &RevisionId,
    ) -> ProviderResult<Option<RevisionId>> {
        let path = normalize(path);
        let end = self.position("previous_revision", revision)?;
        Ok(self.commits[..=end]
            .iter()
            .rev()
            .find(|c| {
                c.changes
                    .iter()
                    .any(|ch| contains(&path, &ch.path, ContainmentPolicy::Ancestor))
            })
            .map(|c| c.commit.revision.clone()))
    }

    fn parent(&self, revision: &RevisionId) -> ProviderResult<Option<RevisionId>> {
        Ok(self.at("parent", revision)?.commit.parent.clone())
    }

    fn is_ancestor(&self, ancestor: &RevisionId, descendant: &RevisionId) -> ProviderResult<bool> {
        Ok(self.position("is_ancestor", ancestor)? <= self.position("is_ancestor", descendant)?)
    }

    fn children(&self, revision: &RevisionId, dir: &str) -> ProviderResult<Option<Vec<TreeEntry>>> {
        let commit = self.at("children", revision)?;
        Ok(tree::children(&commit.hashes, &normalize(dir)))
    }

    fn read(&self, revision: &RevisionId, path: &str) -> ProviderResult<Option<Vec<u8>>> {
        let commit = self.at("read", revision)?;
        Ok(commit.contents.get(&normalize(path)).cloned())
    }

    fn tip(&self) -> ProviderResult<Option<RevisionId>> {
        Ok(self.commits.last().map(|c| c.commit.revision.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commits_record_change_kinds() {
        let mut h = MemoryHistory::new();
        let r1 = h.commit().write("a.txt", "1").write("d/b.txt", "2").finish();
        let r2 = h.commit().write("a.txt", "1b").delete("d").finish();

        let kinds: Vec<(String, ChangeKind)> = h
            .changes(&r2)
            .unwrap()
            .into_iter()
            .map(|c| (c.path, c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("a.txt".to_string(), ChangeKind::Modified),
                ("d/b.txt".to_string(), ChangeKind::Deleted),
            ]
        );
        assert_eq!(h.parent(&r2).unwrap(), Some(r1.clone()));
        assert_eq!(h.commits(Some(&r1)).unwrap().len(), 1);
        assert!(h.hash_of("d/b.txt", &r2).is_none());
        assert_eq!(h.read(&r1, "d/b.txt").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn previous_revision_sees_directory_members() {
        let mut h = MemoryHistory::new();
        let r1 = h.commit().write("d/x", "1").finish();
        let r2 = h.commit().write("other", "2").finish();
        let r3 = h.commit().write("d/y", "3").finish();
        assert_eq!(h.previous_revision("d", &r2).unwrap(), Some(r1.clone()));
        assert_eq!(h.previous_revision("d", &r3).unwrap(), Some(r3.clone()));
        assert_eq!(h.previous_revision("d/x", &r3).unwrap(), Some(r1.clone()));
        assert!(h.is_ancestor(&r1, &r3).unwrap());
        assert!(!h.is_ancestor(&r3, &r1).unwrap());
        assert!(h.parent(&RevisionId::new("nope")).is_err());
    }

    #[test]
    fn directory_hash_changes_with_members() {
        let mut h = MemoryHistory::new();
        let r1 = h.commit().write("d/x", "1").finish();
        let r2 = h.commit().write("d/x", "2").finish();
        assert_ne!(h.hash_of("d", &r1), h.hash_of("d", &r2));
        assert_eq!(h.tip().unwrap(), Some(r2));
    }
}
