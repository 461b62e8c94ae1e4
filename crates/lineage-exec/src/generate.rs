//! Rebuild both graphs from the full project history.
//!
//! Commits are replayed oldest-first. Every raw record added or modified by
//! a commit is parsed and reconciled against the history at that commit;
//! the resulting activities are appended in order. Nothing is written until
//! the whole walk succeeded, so a failed or cancelled run leaves the
//! previously saved documents untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lineage_core::error::Error as CoreError;
use lineage_core::manifest::{now_ms, GenerateManifest};
use lineage_core::provider::{ChangeKind, Commit, RevisionHistory};
use lineage_graph::{DependencyGraph, ProvenanceGraph};
use lineage_recon::{parse_record, Reconciler, RecordContext};
use tracing::info;

use crate::error::ExecError;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::project::Project;

/// Shared flag checked between raw records.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    /// Overwrite graphs that were already saved.
    pub force: bool,
    /// Skip records whose conversion fails with a non-fatal error.
    pub skip_on_error: bool,
}

impl GenerateOptions {
    pub fn from_project(project: &Project) -> Self {
        Self {
            force: false,
            skip_on_error: project.config().skip_on_error,
        }
    }
}

struct Walk {
    dependency: DependencyGraph,
    provenance: ProvenanceGraph,
    manifest: GenerateManifest,
}

pub fn generate<H: RevisionHistory + ?Sized>(
    project: &Project,
    history: &H,
    options: GenerateOptions,
    progress: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<GenerateManifest, ExecError> {
    let store = project.store()?;
    if store.exists() && !options.force {
        return Err(ExecError::AlreadyExists(store.dir().to_path_buf()));
    }

    let commits = history.commits(None)?;
    progress.on_event(&ProgressEvent::Started {
        commits: commits.len(),
    });

    let mut walk = Walk {
        dependency: DependencyGraph::new(project.config().containment),
        provenance: ProvenanceGraph::new(),
        manifest: GenerateManifest::new(now_ms()),
    };
    let reconciler = Reconciler::new(history);
    for (index, commit) in commits.iter().enumerate() {
        progress.on_event(&ProgressEvent::Commit {
            index,
            total: commits.len(),
            revision: &commit.revision,
        });
        replay_commit(project, history, &reconciler, commit, options, progress, cancel, &mut walk)?;
        walk.manifest.commits_walked += 1;
        walk.manifest.head = Some(commit.revision.clone());
    }
    if cancel.is_cancelled() {
        return Err(ExecError::Cancelled);
    }

    let digests = store.save(&walk.dependency, &walk.provenance)?;
    progress.on_event(&ProgressEvent::Saved {
        plans: walk.dependency.node_count(),
        activities: walk.provenance.len(),
    });

    let mut manifest = walk.manifest;
    manifest.plans = walk.dependency.node_count();
    manifest.activities = walk.provenance.len();
    let manifest = manifest.finish(now_ms(), digests.dependency, digests.provenance);
    info!(
        run = %manifest.id.0,
        commits = manifest.commits_walked,
        converted = manifest.records_converted,
        skipped = manifest.records_skipped,
        "generate finished"
    );
    Ok(manifest)
}

#[allow(clippy::too_many_arguments)]
fn replay_commit<H: RevisionHistory + ?Sized>(
    project: &Project,
    history: &H,
    reconciler: &Reconciler<'_, H>,
    commit: &Commit,
    options: GenerateOptions,
    progress: &dyn ProgressSink,
    cancel: &CancelToken,
    walk: &mut Walk,
) -> Result<(), ExecError> {
    let mut records: Vec<String> = history
        .changes(&commit.revision)?
        .into_iter()
        .filter(|c| c.kind != ChangeKind::Deleted && project.config().is_record_path(&c.path))
        .map(|c| c.path)
        .collect();
    records.sort();

    for path in records {
        if cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }
        let ctx = RecordContext {
            path: path.clone(),
            revision: commit.revision.clone(),
            timestamp_ms: commit.timestamp_ms,
        };
        match convert_record(history, reconciler, &ctx, walk) {
            Ok(activities) => {
                walk.manifest.records_converted += 1;
                progress.on_event(&ProgressEvent::Converted {
                    path: &path,
                    activities,
                });
            }
            Err(e) if options.skip_on_error && !e.is_fatal() => {
                walk.manifest.records_skipped += 1;
                let reason = e.to_string();
                progress.on_event(&ProgressEvent::Skipped {
                    path: &path,
                    reason: &reason,
                });
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Parse and reconcile one record; returns the number of activities added.
fn convert_record<H: RevisionHistory + ?Sized>(
    history: &H,
    reconciler: &Reconciler<'_, H>,
    ctx: &RecordContext,
    walk: &mut Walk,
) -> Result<usize, CoreError> {
    let bytes = history
        .read(&ctx.revision, &ctx.path)?
        .ok_or_else(|| CoreError::Record(format!("{} is missing at {}", ctx.path, ctx.revision)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| CoreError::Record(format!("{} is not valid UTF-8", ctx.path)))?;
    let record = parse_record(&text)?;

    let conversion = reconciler.convert(
        &record,
        ctx,
        &mut walk.dependency,
        walk.provenance.next_order(),
    )?;
    Ok(walk.provenance.add_collection(conversion.activities).len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgress;
    use lineage_core::config::ProjectConfig;
    use lineage_io::MemoryHistory;
    use std::cell::Cell;
    use std::path::PathBuf;

    const RECORD: &str = "\
kind: command
command: wc
arguments:
  - value: -l
inputs:
  - consumes: in.txt
outputs:
  - produces: out.txt
usages:
  - path: in.txt
generations:
  - path: out.txt
";

    const BROKEN: &str = "\
kind: command
command: cat
inputs:
  - consumes: missing.txt
outputs:
  - produces: copy.txt
usages:
  - path: missing.txt
";

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("lineage-generate-{}-{}", label, nanos));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn project(label: &str) -> Project {
        Project::new(temp_dir(label), ProjectConfig::default()).unwrap()
    }

    fn history() -> MemoryHistory {
        let mut h = MemoryHistory::new();
        h.commit()
            .write("in.txt", "hello")
            .write("out.txt", "1")
            .write(".lineage/workflow/run.yaml", RECORD)
            .finish();
        h.commit().write("in.txt", "hello again").finish();
        h
    }

    #[test]
    fn generate_builds_and_saves_graphs() {
        let p = project("build");
        let m = generate(&p, &history(), GenerateOptions::default(), &NoopProgress, &CancelToken::new()).unwrap();
        assert_eq!(m.commits_walked, 2);
        assert_eq!(m.records_converted, 1);
        assert_eq!((m.plans, m.activities), (1, 1));
        assert!(m.dependency_digest.is_some());

        let loaded = p.store().unwrap().load().unwrap();
        assert_eq!(loaded.provenance.next_order(), 2);
        assert!(loaded.provenance.latest_generation("out.txt").is_some());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let p = project("force");
        let h = history();
        generate(&p, &h, GenerateOptions::default(), &NoopProgress, &CancelToken::new()).unwrap();
        let again = generate(&p, &h, GenerateOptions::default(), &NoopProgress, &CancelToken::new());
        assert!(matches!(again, Err(ExecError::AlreadyExists(_))));

        let forced = GenerateOptions {
            force: true,
            ..GenerateOptions::default()
        };
        assert!(generate(&p, &h, forced, &NoopProgress, &CancelToken::new()).is_ok());
    }

    #[test]
    fn resolution_failure_aborts_unless_skipping() {
        let p = project("skip");
        let mut h = history();
        h.commit().write(".lineage/workflow/broken.yaml", BROKEN).finish();

        let err = generate(&p, &h, GenerateOptions::default(), &NoopProgress, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, ExecError::Core(CoreError::Resolution { .. })));
        assert!(!p.store().unwrap().exists());

        let skipping = GenerateOptions {
            skip_on_error: true,
            ..GenerateOptions::default()
        };
        let m = generate(&p, &h, skipping, &NoopProgress, &CancelToken::new()).unwrap();
        assert_eq!((m.records_converted, m.records_skipped), (1, 1));
    }

    struct CancelAfterFirst {
        token: CancelToken,
        converted: Cell<usize>,
    }

    impl ProgressSink for CancelAfterFirst {
        fn on_event(&self, event: &ProgressEvent<'_>) {
            if let ProgressEvent::Converted { .. } = event {
                self.converted.set(self.converted.get() + 1);
                self.token.cancel();
            }
        }
    }

    #[test]
    fn cancellation_persists_nothing() {
        let p = project("cancel");
        let mut h = history();
        h.commit()
            .write(".lineage/workflow/again.yaml", RECORD)
            .finish();
        let sink = CancelAfterFirst {
            token: CancelToken::new(),
            converted: Cell::new(0),
        };
        let err = generate(&p, &h, GenerateOptions::default(), &sink, &sink.token).unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
        assert_eq!(sink.converted.get(), 1);
        assert!(!p.store().unwrap().exists());
    }

    #[test]
    fn deleted_records_are_not_read() {
        let p = project("deleted");
        let mut h = history();
        h.commit().delete(".lineage/workflow/run.yaml").finish();
        let m = generate(&p, &h, GenerateOptions::default(), &NoopProgress, &CancelToken::new()).unwrap();
        assert_eq!(m.records_converted, 1);
        assert_eq!(m.commits_walked, 3);
    }

    #[test]
    fn unresolved_invalidation_still_converts() {
        let p = project("invalidation");
        let mut h = history();
        h.commit()
            .write(
                ".lineage/workflow/rm.yaml",
                "kind: command\ncommand: rm\ninvalidations:\n  - path: never.txt\n",
            )
            .finish();
        let m = generate(&p, &h, GenerateOptions::default(), &NoopProgress, &CancelToken::new()).unwrap();
        assert_eq!((m.records_converted, m.records_skipped), (2, 0));
        assert_eq!(m.activities, 2);
    }
}
