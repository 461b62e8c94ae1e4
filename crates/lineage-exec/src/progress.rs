//! Progress reporting for long replays.

use lineage_core::id::RevisionId;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum ProgressEvent<'a> {
    Started { commits: usize },
    Commit { index: usize, total: usize, revision: &'a RevisionId },
    Converted { path: &'a str, activities: usize },
    Skipped { path: &'a str, reason: &'a str },
    Saved { plans: usize, activities: usize },
}

/// Receives progress from `generate`.
pub trait ProgressSink {
    fn on_event(&self, event: &ProgressEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_event(&self, _event: &ProgressEvent<'_>) {}
}

/// Logs milestones through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_event(&self, event: &ProgressEvent<'_>) {
        match event {
            ProgressEvent::Started { commits } => info!(commits, "replaying history"),
            ProgressEvent::Commit {
                index,
                total,
                revision,
            } => debug!(index, total, revision = %revision.short(), "commit"),
            ProgressEvent::Converted { path, activities } => {
                info!(record = %path, activities, "converted record")
            }
            ProgressEvent::Skipped { path, reason } => {
                warn!(record = %path, %reason, "skipped record")
            }
            ProgressEvent::Saved { plans, activities } => {
                info!(plans, activities, "graphs saved")
            }
        }
    }
}
