//! Ordered provenance graph.
//!
//! Activities are appended, never reordered or removed. Each append assigns
//! the next `order` value and updates the per-path latest-usage,
//! latest-generation and latest-invalidation indexes that drive `status`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use lineage_core::activity::{Activity, ActivityCollection};
use lineage_core::error::{Error, Result};
use lineage_core::id::ActivityId;
use lineage_core::path::{contains, normalize, ContainmentPolicy};
use lineage_core::provider::RepositoryState;
use tracing::debug;

/// Most recent recorded state of one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestState {
    pub order: u64,
    pub content_hash: String,
    pub activity: ActivityId,
}

/// Recorded paths whose current state differs from the latest recorded one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub modified: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Modified then deleted paths.
    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.modified.iter().chain(self.deleted.iter())
    }
}

#[derive(Debug, Clone)]
pub struct ProvenanceGraph {
    activities: Vec<Activity>,
    by_id: HashMap<ActivityId, usize>,
    next_order: u64,
    latest_usage: HashMap<String, LatestState>,
    latest_generation: HashMap<String, LatestState>,
    latest_invalidation: HashMap<String, u64>,
}

impl Default for ProvenanceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvenanceGraph {
    pub fn new() -> Self {
        Self {
            activities: Vec::new(),
            by_id: HashMap::new(),
            next_order: 1,
            latest_usage: HashMap::new(),
            latest_generation: HashMap::new(),
            latest_invalidation: HashMap::new(),
        }
    }

    /// Rebuild from persisted activities, keeping their orders.
    ///
    /// `GraphCorruption` on duplicate orders or ids; the counter resumes at
    /// `max(order) + 1`.
    pub fn from_activities(mut activities: Vec<Activity>) -> Result<Self> {
        activities.sort_by_key(|a| a.order);
        let mut graph = Self::new();
        for mut activity in activities {
            if activity.order == 0 || activity.order < graph.next_order {
                return Err(Error::GraphCorruption(format!(
                    "activity {} has duplicate or unassigned order {}",
                    activity.id, activity.order
                )));
            }
            if graph.by_id.contains_key(&activity.id) {
                return Err(Error::GraphCorruption(format!(
                    "duplicate activity id {}",
                    activity.id
                )));
            }
            activity.entities.reindex();
            graph.next_order = activity.order + 1;
            graph.append(activity);
        }
        Ok(graph)
    }

    /// Append an activity, returning the order assigned to it.
    pub fn add(&mut self, activity: Activity) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        let activity = activity.with_order(order);
        debug!(activity = %activity.id, order, path = %activity.path, "appended activity");
        self.append(activity);
        order
    }

    /// Append every activity of a collection, in sequence.
    pub fn add_collection(&mut self, collection: ActivityCollection) -> Vec<u64> {
        collection
            .activities
            .into_iter()
            .map(|activity| self.add(activity))
            .collect()
    }

    /// The order the next appended activity will receive.
    pub fn next_order(&self) -> u64 {
        self.next_order
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn get(&self, id: ActivityId) -> Option<&Activity> {
        self.by_id.get(&id).map(|&i| &self.activities[i])
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn latest_generation(&self, path: &str) -> Option<&LatestState> {
        self.latest_generation.get(&normalize(path))
    }

    pub fn latest_usage(&self, path: &str) -> Option<&LatestState> {
        self.latest_usage.get(&normalize(path))
    }

    /// The most recent recorded state across usages and generations; a
    /// generation wins over a usage of the same order.
    pub fn latest_state(&self, path: &str) -> Option<&LatestState> {
        let path = normalize(path);
        match (self.latest_usage.get(&path), self.latest_generation.get(&path)) {
            (Some(u), Some(g)) => Some(if u.order > g.order { u } else { g }),
            (u, g) => g.or(u),
        }
    }

    /// Compare every recorded path (optionally restricted to those under
    /// `filter`) with the repository's current state.
    ///
    /// Paths whose most recent event is an invalidation are expected to be
    /// gone and are skipped.
    pub fn status(&self, state: &dyn RepositoryState, filter: &[String]) -> Result<ChangeSet> {
        let filter: Vec<String> = filter.iter().map(|p| normalize(p)).collect();
        let recorded: BTreeSet<&String> = self
            .latest_usage
            .keys()
            .chain(self.latest_generation.keys())
            .filter(|p| {
                filter.is_empty()
                    || filter
                        .iter()
                        .any(|f| contains(f, p, ContainmentPolicy::Ancestor))
            })
            .collect();

        let mut changes = ChangeSet::default();
        for path in recorded {
            let Some(latest) = self.latest_state(path) else {
                continue;
            };
            if let Some(&invalidated) = self.latest_invalidation.get(path) {
                if invalidated > latest.order {
                    continue;
                }
            }
            match state.current_hash(path)? {
                None => {
                    changes.deleted.insert(path.clone());
                }
                Some(current) if current != latest.content_hash => {
                    changes.modified.insert(path.clone());
                }
                Some(_) => {}
            }
        }
        Ok(changes)
    }

    fn append(&mut self, activity: Activity) {
        let order = activity.order;
        let id = activity.id;
        for entity in activity.used_entities() {
            record(&mut self.latest_usage, &entity.path, &entity.content_hash, order, id);
        }
        for entity in activity.generated_entities() {
            record(&mut self.latest_generation, &entity.path, &entity.content_hash, order, id);
        }
        for entity in activity.invalidated_entities() {
            let slot = self.latest_invalidation.entry(entity.path.clone()).or_insert(order);
            *slot = (*slot).max(order);
        }
        self.by_id.insert(id, self.activities.len());
        self.activities.push(activity);
    }
}

fn record(
    index: &mut HashMap<String, LatestState>,
    path: &str,
    content_hash: &str,
    order: u64,
    activity: ActivityId,
) {
    match index.get(path) {
        Some(existing) if existing.order > order => {}
        _ => {
            index.insert(
                path.to_string(),
                LatestState {
                    order,
                    content_hash: content_hash.to_string(),
                    activity,
                },
            );
        }
    }
}
