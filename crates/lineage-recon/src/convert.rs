//! Reconciliation: raw record -> `ActivityCollection`.
//!
//! Every run of a record is resolved completely (usages, generations,
//! invalidations, role checks) before any Plan is registered, so a failed
//! resolution never leaves a half-registered record in the dependency graph.

use lineage_core::activity::{Activity, ActivityBuilder, ActivityCollection, Agent};
use lineage_core::error::{Error, Result};
use lineage_core::id::{PlanId, RevisionId};
use lineage_core::path::{contains, normalize, ContainmentPolicy};
use lineage_core::plan::Plan;
use lineage_core::provider::RevisionHistory;
use lineage_graph::DependencyGraph;
use tracing::{debug, warn};

use crate::raw::{RawRecord, RawReference, RawRun};
use crate::resolve::{Resolver, TemporalFilter};

/// Where a raw record was found.
#[derive(Debug, Clone)]
pub struct RecordContext {
    /// Project-relative path of the record.
    pub path: String,
    /// The commit that added or modified the record.
    pub revision: RevisionId,
    /// Commit time, used when a run carries no timestamps.
    pub timestamp_ms: u64,
}

/// A non-fatal problem met while converting a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub record: String,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Conversion {
    pub activities: ActivityCollection,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Reconciler<'h, H: RevisionHistory + ?Sized> {
    history: &'h H,
    resolver: Resolver<'h, H>,
}

impl<'h, H: RevisionHistory + ?Sized> Reconciler<'h, H> {
    pub fn new(history: &'h H) -> Self {
        Self {
            history,
            resolver: Resolver::new(history),
        }
    }

    /// Convert one record. Activities get orders `first_order..`; plans are
    /// registered in `graph` only once every run resolved.
    pub fn convert(
        &self,
        record: &RawRecord,
        ctx: &RecordContext,
        graph: &mut DependencyGraph,
        first_order: u64,
    ) -> Result<Conversion> {
        let mut diagnostics = Vec::new();
        let mut pending: Vec<(Plan, Activity)> = Vec::new();
        // Paths generated by earlier runs of this record.
        let mut produced: Vec<String> = Vec::new();

        for run in record.runs() {
            let plan = run.to_plan();
            let activity = self.resolve_run(run, plan.id, ctx, &produced, &mut diagnostics)?;
            produced.extend(run.generations.iter().map(|g| normalize(&g.path)));
            pending.push((plan, activity));
        }

        let mut activities = ActivityCollection::new(ctx.path.clone());
        for (order, (plan, mut activity)) in (first_order..).zip(pending) {
            activity.plan = graph.add(plan)?;
            debug!(
                activity = %activity.id,
                plan = %activity.plan,
                order,
                usages = activity.usages.len(),
                generations = activity.generations.len(),
                "converted activity"
            );
            activities.push(activity.with_order(order));
        }

        for d in &diagnostics {
            warn!(record = %d.record, path = %d.path, "{}", d.message);
        }
        Ok(Conversion {
            activities,
            diagnostics,
        })
    }

    fn resolve_run(
        &self,
        run: &RawRun,
        plan: PlanId,
        ctx: &RecordContext,
        produced: &[String],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Activity> {
        let agents = if run.agents.is_empty() {
            vec![Agent::software()]
        } else {
            run.agents.clone()
        };
        let started = run.started_ms.unwrap_or(ctx.timestamp_ms);
        let ended = run.ended_ms.unwrap_or(started);
        let mut builder = ActivityBuilder::new(plan, ctx.path.clone())
            .agents(agents)
            .times(started, ended);

        // Inputs are read before the run; a root commit has nothing earlier.
        let before_run = self
            .history
            .parent(&ctx.revision)?
            .unwrap_or_else(|| ctx.revision.clone());
        for (i, usage) in run.usages.iter().enumerate() {
            let path = normalize(&usage.path);
            let approx = match &usage.revision {
                Some(rev) => RevisionId::new(rev.as_str()),
                // Written by an earlier step of the same record.
                None if produced
                    .iter()
                    .any(|p| contains(p, &path, ContainmentPolicy::Ancestor)) =>
                {
                    ctx.revision.clone()
                }
                None => before_run.clone(),
            };
            let mut tree = self
                .resolver
                .resolve(&path, &approx, TemporalFilter::AtOrBefore)?;
            // Inputs committed together with the record are not in the parent.
            if tree.is_none() && usage.revision.is_none() && approx != ctx.revision {
                tree = self
                    .resolver
                    .resolve(&path, &ctx.revision, TemporalFilter::AtOrBefore)?;
            }
            let tree = tree.ok_or_else(|| {
                unresolved(usage, &approx, "no content at revision or in the record's commit")
            })?;
            builder.add_usage(tree, &usage.role_or("input", i))?;
        }

        for (i, generation) in run.generations.iter().enumerate() {
            let approx = explicit_or(generation, &ctx.revision);
            let tree = match self
                .resolver
                .resolve(&generation.path, &approx, TemporalFilter::Exactly)?
            {
                Some(tree) => tree,
                None => match self.history.parent(&approx)? {
                    Some(parent) => self
                        .resolver
                        .resolve(&generation.path, &parent, TemporalFilter::Exactly)?
                        .ok_or_else(|| {
                            unresolved(generation, &approx, "no content at revision or its parent")
                        })?,
                    None => return Err(unresolved(generation, &approx, "no content at revision")),
                },
            };
            builder.add_generation(tree, &generation.role_or("output", i))?;
        }

        for invalidation in &run.invalidations {
            let approx = explicit_or(invalidation, &ctx.revision);
            let mut entity = self.resolver.resolve_flat(&invalidation.path, &approx)?;
            if entity.is_none() {
                if let Some(parent) = self.history.parent(&approx)? {
                    entity = self.resolver.resolve_flat(&invalidation.path, &parent)?;
                }
            }
            match entity {
                Some(entity) => {
                    builder.add_invalidation(entity);
                }
                None => diagnostics.push(Diagnostic {
                    record: ctx.path.clone(),
                    path: invalidation.path.clone(),
                    message: format!(
                        "invalidation dropped: no content at {} or its parent",
                        approx.short()
                    ),
                }),
            }
        }

        Ok(builder.build())
    }
}

fn explicit_or(reference: &RawReference, default: &RevisionId) -> RevisionId {
    reference
        .revision
        .as_deref()
        .map(RevisionId::new)
        .unwrap_or_else(|| default.clone())
}

fn unresolved(reference: &RawReference, revision: &RevisionId, reason: &str) -> Error {
    Error::Resolution {
        path: reference.path.clone(),
        revision: revision.clone(),
        reason: reason.to_string(),
    }
}
