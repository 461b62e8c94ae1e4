//! Concrete executions.
//!
//! An `Activity` is one ordered run of a `Plan`: what it used, what it
//! generated and what it invalidated, each pinned to an exact content hash.
//! Activities own their entities through an `EntityArena`; usages and
//! generations are role-qualified edges into that arena.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entity::{Entity, EntityArena, EntityIdx, EntityKey, EntityTree};
use crate::error::{Error, Result};
use crate::id::{ActivityId, PlanId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Person,
    Software,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub kind: AgentKind,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Agent {
    /// The agent recorded for this tool itself.
    pub fn software() -> Self {
        Self {
            kind: AgentKind::Software,
            name: format!("lineage {}", crate::VERSION),
            email: None,
        }
    }
}

/// A role-qualified edge from an activity to an entity it consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub entity: EntityIdx,
    pub role: String,
}

/// A role-qualified edge from an activity to an entity it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub entity: EntityIdx,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    /// Position in global execution history; `0` until a provenance graph
    /// assigns it.
    pub order: u64,
    pub plan: PlanId,
    /// Project-relative path of the raw record this activity came from.
    pub path: String,
    pub agents: Vec<Agent>,
    pub started_ms: u64,
    pub ended_ms: u64,
    pub entities: EntityArena,
    pub usages: Vec<Usage>,
    pub generations: Vec<Generation>,
    pub invalidated: Vec<EntityIdx>,
}

impl Activity {
    pub fn with_order(mut self, order: u64) -> Self {
        self.order = order;
        self
    }

    pub fn entity(&self, idx: EntityIdx) -> Option<&Entity> {
        self.entities.get(idx)
    }

    /// Every entity reachable from a usage, collection members included.
    pub fn used_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.reachable(self.usages.iter().map(|u| u.entity))
    }

    /// Every entity reachable from a generation, collection members included.
    pub fn generated_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.reachable(self.generations.iter().map(|g| g.entity))
    }

    pub fn invalidated_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.invalidated.iter().filter_map(|i| self.entities.get(*i))
    }

    fn reachable<'a>(
        &'a self,
        roots: impl Iterator<Item = EntityIdx> + 'a,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        let mut seen = std::collections::HashSet::new();
        roots
            .flat_map(move |root| self.entities.walk(root))
            .filter(move |idx| seen.insert(*idx))
            .filter_map(move |idx| self.entities.get(idx))
    }
}

/// The activities converted from one raw record, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCollection {
    pub path: String,
    pub activities: Vec<Activity>,
}

impl ActivityCollection {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            activities: Vec::new(),
        }
    }

    pub fn push(&mut self, activity: Activity) {
        self.activities.push(activity);
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter()
    }
}

/// Assembles an activity, deduplicating edges and rejecting role conflicts.
#[derive(Debug)]
pub struct ActivityBuilder {
    id: ActivityId,
    plan: PlanId,
    path: String,
    agents: Vec<Agent>,
    started_ms: u64,
    ended_ms: u64,
    entities: EntityArena,
    usages: Vec<Usage>,
    usage_roles: HashMap<EntityKey, String>,
    generations: Vec<Generation>,
    generation_roles: HashMap<EntityKey, String>,
    invalidated: Vec<EntityIdx>,
}

impl ActivityBuilder {
    pub fn new(plan: PlanId, path: impl Into<String>) -> Self {
        Self {
            id: ActivityId::generate(),
            plan,
            path: path.into(),
            agents: Vec::new(),
            started_ms: 0,
            ended_ms: 0,
            entities: EntityArena::new(),
            usages: Vec::new(),
            usage_roles: HashMap::new(),
            generations: Vec::new(),
            generation_roles: HashMap::new(),
            invalidated: Vec::new(),
        }
    }

    pub fn id(mut self, id: ActivityId) -> Self {
        self.id = id;
        self
    }

    pub fn agents(mut self, agents: Vec<Agent>) -> Self {
        self.agents = agents;
        self
    }

    pub fn times(mut self, started_ms: u64, ended_ms: u64) -> Self {
        self.started_ms = started_ms;
        self.ended_ms = ended_ms.max(started_ms);
        self
    }

    pub fn add_usage(&mut self, tree: EntityTree, role: &str) -> Result<EntityIdx> {
        let key = tree_key(&tree);
        if check_role(&self.usage_roles, &key, role)? {
            return self.existing(&key);
        }
        let entity = self.entities.insert_tree(tree);
        self.usage_roles.insert(key, role.to_string());
        self.usages.push(Usage {
            entity,
            role: role.to_string(),
        });
        Ok(entity)
    }

    pub fn add_generation(&mut self, tree: EntityTree, role: &str) -> Result<EntityIdx> {
        let key = tree_key(&tree);
        if check_role(&self.generation_roles, &key, role)? {
            return self.existing(&key);
        }
        let entity = self.entities.insert_tree(tree);
        self.generation_roles.insert(key, role.to_string());
        self.generations.push(Generation {
            entity,
            role: role.to_string(),
        });
        Ok(entity)
    }

    pub fn add_invalidation(&mut self, entity: Entity) -> EntityIdx {
        let idx = self.entities.intern(entity);
        if !self.invalidated.contains(&idx) {
            self.invalidated.push(idx);
        }
        idx
    }

    pub fn build(self) -> Activity {
        Activity {
            id: self.id,
            order: 0,
            plan: self.plan,
            path: self.path,
            agents: self.agents,
            started_ms: self.started_ms,
            ended_ms: self.ended_ms,
            entities: self.entities,
            usages: self.usages,
            generations: self.generations,
            invalidated: self.invalidated,
        }
    }

    fn existing(&self, key: &EntityKey) -> Result<EntityIdx> {
        self.entities
            .lookup(key)
            .ok_or_else(|| Error::Invariant(format!("entity '{}' missing from arena", key.path)))
    }
}

fn tree_key(tree: &EntityTree) -> EntityKey {
    EntityKey {
        path: tree.path.clone(),
        content_hash: tree.content_hash.clone(),
    }
}

/// `Ok(true)` when the same entity is already present under the same role.
fn check_role(roles: &HashMap<EntityKey, String>, key: &EntityKey, role: &str) -> Result<bool> {
    match roles.get(key) {
        None => Ok(false),
        Some(existing) if existing == role => Ok(true),
        Some(existing) => Err(Error::RoleConflict {
            path: key.path.clone(),
            checksum: key.content_hash.clone(),
            existing: existing.clone(),
            requested: role.to_string(),
        }),
    }
}
