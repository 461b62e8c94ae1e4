//! Graph store: reload fidelity and all-or-nothing replacement.

mod fixtures;

use fixtures::{command_record, temp_dir};
use lineage_core::config::ProjectConfig;
use lineage_exec::{generate, CancelToken, ExecError, GenerateOptions, NoopProgress, Project};
use lineage_io::MemoryHistory;
use std::fs;

fn pipeline_history() -> MemoryHistory {
    let mut h = MemoryHistory::new();
    h.commit()
        .write("raw/a.csv", "a")
        .write("raw/b.csv", "b")
        .write("clean/all.csv", "ab")
        .write(
            ".lineage/workflow/01-clean.yaml",
            command_record("clean", &["raw"], &["clean/all.csv"]),
        )
        .finish();
    h.commit()
        .write("report.txt", "2 rows")
        .write(
            ".lineage/workflow/02-report.yaml",
            command_record("report", &["clean/all.csv"], &["report.txt"]),
        )
        .finish();
    h
}

fn forced() -> GenerateOptions {
    GenerateOptions {
        force: true,
        ..GenerateOptions::default()
    }
}

#[test]
fn reload_reproduces_plans_edges_and_latest_states() {
    let project = Project::new(temp_dir("reload"), ProjectConfig::default()).unwrap();
    let h = pipeline_history();
    generate(&project, &h, GenerateOptions::default(), &NoopProgress, &CancelToken::new()).unwrap();

    let store = project.store().unwrap();
    let first = store.load().unwrap();
    assert_eq!(first.dependency.node_count(), 2);
    assert_eq!(first.dependency.edge_count(), 1);
    assert_eq!(first.provenance.len(), 2);

    // Saving what was loaded must not change anything observable.
    store.save(&first.dependency, &first.provenance).unwrap();
    let second = store.load().unwrap();
    assert_eq!(second.dependency.plans(), first.dependency.plans());
    assert_eq!(second.dependency.edge_count(), first.dependency.edge_count());
    for path in ["raw", "raw/a.csv", "clean/all.csv", "report.txt"] {
        assert_eq!(
            second.provenance.latest_state(path),
            first.provenance.latest_state(path),
            "{path}"
        );
    }
    assert_eq!(second.provenance.next_order(), 3);
}

#[test]
fn failed_generate_keeps_previous_documents() {
    let root = temp_dir("keep");
    let project = Project::new(&root, ProjectConfig::default()).unwrap();
    let mut h = pipeline_history();
    generate(&project, &h, GenerateOptions::default(), &NoopProgress, &CancelToken::new()).unwrap();

    let graphs = root.join(".lineage/graphs");
    let before = fs::read(graphs.join("provenance.json")).unwrap();

    h.commit()
        .write(
            ".lineage/workflow/03-broken.yaml",
            command_record("broken", &["missing.csv"], &[]),
        )
        .finish();
    let err = generate(&project, &h, forced(), &NoopProgress, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, ExecError::Core(_)));
    assert_eq!(fs::read(graphs.join("provenance.json")).unwrap(), before);

    let cancelled = CancelToken::new();
    cancelled.cancel();
    let err = generate(&project, &h, forced(), &NoopProgress, &cancelled).unwrap_err();
    assert!(matches!(err, ExecError::Cancelled));
    assert_eq!(fs::read(graphs.join("provenance.json")).unwrap(), before);
}

#[test]
fn force_rebuild_replaces_documents() {
    let project = Project::new(temp_dir("force"), ProjectConfig::default()).unwrap();
    let mut h = pipeline_history();
    generate(&project, &h, GenerateOptions::default(), &NoopProgress, &CancelToken::new()).unwrap();

    h.commit()
        .write("summary.txt", "s")
        .write(
            ".lineage/workflow/03-summary.yaml",
            command_record("summarize", &["report.txt"], &["summary.txt"]),
        )
        .finish();
    assert!(matches!(
        generate(&project, &h, GenerateOptions::default(), &NoopProgress, &CancelToken::new()),
        Err(ExecError::AlreadyExists(_))
    ));
    let manifest = generate(&project, &h, forced(), &NoopProgress, &CancelToken::new()).unwrap();
    assert_eq!(manifest.plans, 3);
    assert_eq!(project.store().unwrap().load().unwrap().provenance.len(), 3);
}
