//! Pinning references to exact content.
//!
//! A reference is resolved in two steps: its approximate revision is
//! narrowed to the exact revision that last touched the path, then the
//! content hash at that revision is read. Directories expand into
//! collections; which children are kept depends on the `TemporalFilter`.

use lineage_core::entity::{Entity, EntityTree};
use lineage_core::error::Result;
use lineage_core::id::RevisionId;
use lineage_core::path::normalize;
use lineage_core::provider::RevisionHistory;
use tracing::trace;

/// Which children of a directory belong to a resolved collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalFilter {
    /// Children whose last change is at or before the revision (usages).
    AtOrBefore,
    /// Children changed in exactly the revision (generations).
    Exactly,
}

pub struct Resolver<'h, H: RevisionHistory + ?Sized> {
    history: &'h H,
}

impl<'h, H: RevisionHistory + ?Sized> Resolver<'h, H> {
    pub fn new(history: &'h H) -> Self {
        Self { history }
    }

    /// Nearest revision at or before `approx` that touched `path`.
    pub fn exact_revision(&self, path: &str, approx: &RevisionId) -> Result<Option<RevisionId>> {
        Ok(self.history.previous_revision(path, approx)?)
    }

    /// Resolve `path` as of `approx`, expanding directories under `filter`.
    /// `Ok(None)` when the path has no content there.
    pub fn resolve(
        &self,
        path: &str,
        approx: &RevisionId,
        filter: TemporalFilter,
    ) -> Result<Option<EntityTree>> {
        let path = normalize(path);
        let Some(exact) = self.exact_revision(&path, approx)? else {
            return Ok(None);
        };
        self.expand(&path, &exact, filter)
    }

    /// Resolve `path` as a plain file entity, ignoring any directory
    /// structure.
    pub fn resolve_flat(&self, path: &str, approx: &RevisionId) -> Result<Option<Entity>> {
        let path = normalize(path);
        let Some(exact) = self.exact_revision(&path, approx)? else {
            return Ok(None);
        };
        Ok(self
            .history
            .content_hash(&exact, &path)?
            .map(|hash| Entity::file(path, hash, exact)))
    }

    fn expand(
        &self,
        path: &str,
        revision: &RevisionId,
        filter: TemporalFilter,
    ) -> Result<Option<EntityTree>> {
        let Some(hash) = self.history.content_hash(revision, path)? else {
            return Ok(None);
        };
        let Some(entries) = self.history.children(revision, path)? else {
            return Ok(Some(EntityTree::file(path, hash, revision.clone())));
        };

        let mut children = Vec::new();
        for entry in entries {
            let Some(child_rev) = self.history.previous_revision(&entry.path, revision)? else {
                trace!(path = %entry.path, "child has no history, omitted");
                continue;
            };
            let keep = match filter {
                TemporalFilter::AtOrBefore => self.history.is_ancestor(&child_rev, revision)?,
                TemporalFilter::Exactly => &child_rev == revision,
            };
            if !keep {
                continue;
            }
            match self.expand(&entry.path, &child_rev, filter)? {
                Some(child) => children.push(child),
                None => trace!(path = %entry.path, "child unresolvable, omitted"),
            }
        }

        Ok(Some(EntityTree {
            path: path.to_string(),
            content_hash: hash,
            revision: revision.clone(),
            children: Some(children),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_io::memory_history::MemoryHistory;

    /// r1 adds three files under `out/`; r2 modifies one of them.
    fn history() -> (MemoryHistory, RevisionId, RevisionId) {
        let mut h = MemoryHistory::new();
        let r1 = h
            .commit()
            .write("out/a.txt", "a1")
            .write("out/b.txt", "b1")
            .write("out/c.txt", "c1")
            .finish();
        let r2 = h.commit().write("out/b.txt", "b2").finish();
        (h, r1, r2)
    }

    #[test]
    fn generation_keeps_only_children_changed_in_revision() {
        let (h, _, r2) = history();
        let tree = Resolver::new(&h)
            .resolve("out", &r2, TemporalFilter::Exactly)
            .unwrap()
            .unwrap();
        let children = tree.children.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path, "out/b.txt");
    }

    #[test]
    fn usage_keeps_every_child_up_to_revision() {
        let (h, r1, r2) = history();
        let tree = Resolver::new(&h)
            .resolve("out", &r2, TemporalFilter::AtOrBefore)
            .unwrap()
            .unwrap();
        let children = tree.children.as_ref().unwrap();
        assert_eq!(children.len(), 3);
        let a = children.iter().find(|c| c.path == "out/a.txt").unwrap();
        assert_eq!(a.revision, r1);
        assert_eq!(tree.size(), 4);
    }

    #[test]
    fn exact_revision_narrows_to_last_touch() {
        let (h, r1, r2) = history();
        let resolver = Resolver::new(&h);
        assert_eq!(resolver.exact_revision("out/a.txt", &r2).unwrap(), Some(r1));
        assert!(resolver
            .resolve("missing.txt", &r2, TemporalFilter::AtOrBefore)
            .unwrap()
            .is_none());
    }

    #[test]
    fn flat_resolution_misses_deleted_files() {
        let mut h = MemoryHistory::new();
        let r1 = h.commit().write("tmp.txt", "t").finish();
        let r2 = h.commit().delete("tmp.txt").finish();
        let resolver = Resolver::new(&h);
        assert!(resolver.resolve_flat("tmp.txt", &r2).unwrap().is_none());
        let prior = resolver.resolve_flat("tmp.txt", &r1).unwrap().unwrap();
        assert_eq!(prior.revision, r1);
    }
}
