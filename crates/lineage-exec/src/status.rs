//! Staleness report: which generated paths are out of date and why.

use std::collections::{BTreeMap, BTreeSet};

use lineage_core::provider::RepositoryState;
use lineage_io::LoadedGraphs;
use serde::Serialize;

use crate::error::ExecError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Changed path -> every output downstream of it.
    pub updates: BTreeMap<String, BTreeSet<String>>,
    pub modified: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
}

impl StatusReport {
    pub fn is_clean(&self) -> bool {
        self.updates.is_empty()
    }

    /// `1` when some outputs need regenerating.
    pub fn exit_code(&self) -> i32 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }
}

/// Compare recorded state with `state` (restricted to `paths` when given)
/// and propagate every change through the dependency graph.
pub fn status(
    graphs: &LoadedGraphs,
    state: &dyn RepositoryState,
    paths: &[String],
) -> Result<StatusReport, ExecError> {
    let changes = graphs.provenance.status(state, paths)?;

    let mut updates = BTreeMap::new();
    for path in changes.paths() {
        let stale = graphs.dependency.downstream_paths(path);
        if !stale.is_empty() {
            updates.insert(path.clone(), stale);
        }
    }
    Ok(StatusReport {
        updates,
        modified: changes.modified,
        deleted: changes.deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::activity::ActivityBuilder;
    use lineage_core::entity::EntityTree;
    use lineage_core::id::RevisionId;
    use lineage_core::plan::{InputPattern, OutputPattern, Plan};
    use lineage_graph::{DependencyGraph, ProvenanceGraph};
    use lineage_io::MemoryState;

    fn graphs() -> LoadedGraphs {
        let mut dependency = DependencyGraph::default();
        let a = dependency
            .add(Plan::new(
                "a",
                vec![],
                vec![InputPattern::new("in.txt")],
                vec![OutputPattern::new("mid.txt")],
                vec![],
            ))
            .unwrap();
        dependency
            .add(Plan::new(
                "b",
                vec![],
                vec![InputPattern::new("mid.txt")],
                vec![OutputPattern::new("out.txt")],
                vec![],
            ))
            .unwrap();

        let rev = RevisionId::new("r1");
        let mut b = ActivityBuilder::new(a, "run.yaml");
        b.add_usage(EntityTree::file("in.txt", "h-in", rev.clone()), "input-1")
            .unwrap();
        b.add_generation(EntityTree::file("mid.txt", "h-mid", rev), "output-1")
            .unwrap();
        let mut provenance = ProvenanceGraph::new();
        provenance.add(b.build());
        LoadedGraphs {
            dependency,
            provenance,
        }
    }

    fn state(files: &[(&str, &str)]) -> MemoryState {
        let mut s = MemoryState::new();
        for (path, content) in files {
            s.write(path, content);
        }
        s
    }

    #[test]
    fn changed_input_marks_transitive_outputs() {
        let g = graphs();
        // MemoryState hashes contents, so neither recorded hash matches.
        let s = state(&[("in.txt", "new"), ("mid.txt", "m")]);
        let report = status(&g, &s, &[]).unwrap();
        assert!(report.modified.contains("in.txt"));
        let stale = &report.updates["in.txt"];
        assert!(stale.contains("mid.txt"));
        assert!(stale.contains("out.txt"));
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn deleted_paths_are_reported_separately() {
        let g = graphs();
        let report = status(&g, &MemoryState::new(), &["mid.txt".to_string()]).unwrap();
        assert_eq!(report.deleted, BTreeSet::from(["mid.txt".to_string()]));
        assert!(report.modified.is_empty());
        assert_eq!(report.updates["mid.txt"], BTreeSet::from(["out.txt".to_string()]));
    }

    #[test]
    fn empty_graphs_are_clean() {
        let g = LoadedGraphs {
            dependency: DependencyGraph::default(),
            provenance: ProvenanceGraph::new(),
        };
        let report = status(&g, &MemoryState::new(), &[]).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.exit_code(), 0);
    }
}
