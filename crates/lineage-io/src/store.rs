//! On-disk graph store.
//!
//! Both documents live in one directory (`<metadata>/graphs`). `save`
//! replaces that directory as a unit:
//!
//! 1. write both documents into `<graphs>.staging` and sync them;
//! 2. rename the live directory to `<graphs>.backup`;
//! 3. rename staging into place;
//! 4. remove the backup.
//!
//! `open` repairs an interrupted swap: a stale staging directory is
//! discarded and a lone backup is restored, so a crash at any step leaves
//! either the old or the new pair of documents, never a mix.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use lineage_core::error::Error as CoreError;
use lineage_core::hash::{hash_bytes, Hash256};
use lineage_core::path::ContainmentPolicy;
use lineage_core::uri::UriBuilder;
use lineage_graph::{DependencyGraph, ProvenanceGraph};
use tracing::{debug, warn};

use crate::document::{self, Document};
use crate::error::{Error, Result};

pub const DEPENDENCY_FILE: &str = "dependency.json";
pub const PROVENANCE_FILE: &str = "provenance.json";

pub struct LoadedGraphs {
    pub dependency: DependencyGraph,
    pub provenance: ProvenanceGraph,
}

/// Digests of the documents written by `save`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedDigests {
    pub dependency: Hash256,
    pub provenance: Hash256,
}

#[derive(Debug, Clone)]
pub struct GraphStore {
    dir: PathBuf,
    uris: UriBuilder,
    policy: ContainmentPolicy,
}

impl GraphStore {
    /// Open the store rooted at `dir`, repairing an interrupted save.
    pub fn open(dir: impl Into<PathBuf>, uris: UriBuilder, policy: ContainmentPolicy) -> Result<Self> {
        let store = Self {
            dir: dir.into(),
            uris,
            policy,
        };
        store.recover()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a complete pair of documents is present.
    pub fn exists(&self) -> bool {
        self.dir.join(DEPENDENCY_FILE).is_file() && self.dir.join(PROVENANCE_FILE).is_file()
    }

    pub fn load(&self) -> Result<LoadedGraphs> {
        if !self.exists() {
            return Err(Error::MissingGraphs(self.dir.clone()));
        }
        let dep_doc = Document::from_json(&fs::read(self.dir.join(DEPENDENCY_FILE))?)?;
        let prov_doc = Document::from_json(&fs::read(self.dir.join(PROVENANCE_FILE))?)?;
        let dependency = document::dependency_from_document(&dep_doc, &self.uris, self.policy)?;
        let provenance = document::provenance_from_document(&prov_doc, &self.uris)?;

        if let Some(orphan) = provenance
            .activities()
            .iter()
            .find(|a| dependency.get(a.plan).is_none())
        {
            return Err(CoreError::GraphCorruption(format!(
                "activity {} references unknown plan {}",
                orphan.id, orphan.plan
            ))
            .into());
        }
        debug!(
            dir = %self.dir.display(),
            plans = dependency.node_count(),
            activities = provenance.len(),
            "loaded graphs"
        );
        Ok(LoadedGraphs {
            dependency,
            provenance,
        })
    }

    /// Persist both graphs, replacing any previous pair as a unit.
    pub fn save(&self, dependency: &DependencyGraph, provenance: &ProvenanceGraph) -> Result<SavedDigests> {
        let dep_bytes = document::dependency_document(dependency, &self.uris).to_json()?;
        let prov_bytes = document::provenance_document(provenance, &self.uris).to_json()?;

        let staging = self.sibling("staging");
        let backup = self.sibling("backup");
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;
        write_synced(&staging.join(DEPENDENCY_FILE), &dep_bytes)?;
        write_synced(&staging.join(PROVENANCE_FILE), &prov_bytes)?;

        if backup.exists() {
            fs::remove_dir_all(&backup)?;
        }
        if self.dir.exists() {
            fs::rename(&self.dir, &backup)?;
        }
        fs::rename(&staging, &self.dir)?;
        if backup.exists() {
            fs::remove_dir_all(&backup)?;
        }

        debug!(dir = %self.dir.display(), "saved graphs");
        Ok(SavedDigests {
            dependency: hash_bytes(&dep_bytes),
            provenance: hash_bytes(&prov_bytes),
        })
    }

    fn recover(&self) -> Result<()> {
        let staging = self.sibling("staging");
        let backup = self.sibling("backup");
        if staging.exists() {
            warn!(dir = %staging.display(), "discarding unfinished graph save");
            fs::remove_dir_all(&staging)?;
        }
        if backup.exists() {
            if self.dir.exists() {
                fs::remove_dir_all(&backup)?;
            } else {
                warn!(dir = %self.dir.display(), "restoring graphs from interrupted save");
                fs::rename(&backup, &self.dir)?;
            }
        }
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "graphs".to_string());
        self.dir.with_file_name(format!("{name}.{suffix}"))
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    f.flush()?;
    f.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::activity::ActivityBuilder;
    use lineage_core::entity::EntityTree;
    use lineage_core::id::RevisionId;
    use lineage_core::plan::{InputPattern, OutputPattern, Plan};

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("lineage-store-{}-{}", label, nanos));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn graphs() -> (DependencyGraph, ProvenanceGraph) {
        let mut deps = DependencyGraph::default();
        let plan = deps
            .add(Plan::new(
                "wc",
                vec![],
                vec![InputPattern::new("in.txt")],
                vec![OutputPattern::new("out.txt")],
                vec![],
            ))
            .unwrap();
        let mut prov = ProvenanceGraph::new();
        let mut b = ActivityBuilder::new(plan, "run.yaml");
        b.add_usage(EntityTree::file("in.txt", "i", RevisionId::new("r")), "input-1")
            .unwrap();
        prov.add(b.build());
        (deps, prov)
    }

    fn store(root: &Path) -> GraphStore {
        GraphStore::open(root.join("graphs"), UriBuilder::default(), ContainmentPolicy::Ancestor)
            .unwrap()
    }

    #[test]
    fn missing_graphs_are_reported() {
        let root = temp_dir("missing");
        let s = store(&root);
        assert!(!s.exists());
        assert!(matches!(s.load(), Err(Error::MissingGraphs(_))));
    }

    #[test]
    fn save_then_load_round_trips() {
        let root = temp_dir("roundtrip");
        let (deps, prov) = graphs();
        let s = store(&root);
        let digests = s.save(&deps, &prov).unwrap();
        assert_ne!(digests.dependency, digests.provenance);

        let loaded = s.load().unwrap();
        assert_eq!(loaded.dependency.plans(), deps.plans());
        assert_eq!(loaded.provenance.next_order(), 2);
        assert_eq!(
            loaded.provenance.latest_usage("in.txt"),
            prov.latest_usage("in.txt")
        );
        assert!(!root.join("graphs.staging").exists());
        assert!(!root.join("graphs.backup").exists());
    }

    #[test]
    fn open_restores_backup_after_interrupted_swap() {
        let root = temp_dir("recover");
        let (deps, prov) = graphs();
        store(&root).save(&deps, &prov).unwrap();

        // Crash between moving the live dir aside and promoting staging.
        fs::rename(root.join("graphs"), root.join("graphs.backup")).unwrap();
        fs::create_dir_all(root.join("graphs.staging")).unwrap();
        fs::write(root.join("graphs.staging").join(DEPENDENCY_FILE), b"{").unwrap();

        let s = store(&root);
        assert!(s.exists());
        assert!(!root.join("graphs.staging").exists());
        assert_eq!(s.load().unwrap().dependency.node_count(), 1);
    }

    #[test]
    fn orphaned_activity_is_corruption() {
        let root = temp_dir("orphan");
        let (_, prov) = graphs();
        let s = store(&root);
        s.save(&DependencyGraph::default(), &prov).unwrap();
        assert!(matches!(
            s.load(),
            Err(Error::Core(CoreError::GraphCorruption(_)))
        ));
    }
}
