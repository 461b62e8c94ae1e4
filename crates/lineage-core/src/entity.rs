//! Content-addressed file and directory references.
//!
//! Entities of one activity live in an `EntityArena`: a collection's members
//! are indices into the same arena, and an entity with a given
//! `(path, content_hash)` identity is stored exactly once per arena.
//! Arenas are never shared between activities.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::id::RevisionId;

/// Index of an entity inside its activity's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(transparent)]
pub struct EntityIdx(pub u32);

impl EntityIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Value identity of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct EntityKey {
    pub path: String,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    File,
    /// Directory-like entity; members point into the owning arena.
    Collection { members: Vec<EntityIdx> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub path: String,
    pub content_hash: String,
    pub revision: RevisionId,
    pub kind: EntityKind,
}

impl Entity {
    pub fn file(path: impl Into<String>, content_hash: impl Into<String>, revision: RevisionId) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
            revision,
            kind: EntityKind::File,
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey {
            path: self.path.clone(),
            content_hash: self.content_hash.clone(),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, EntityKind::Collection { .. })
    }

    pub fn members(&self) -> &[EntityIdx] {
        match &self.kind {
            EntityKind::File => &[],
            EntityKind::Collection { members } => members,
        }
    }
}

/// A resolved entity before it is placed into an arena. `children` is
/// `Some` for collections (possibly empty after filtering).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTree {
    pub path: String,
    pub content_hash: String,
    pub revision: RevisionId,
    pub children: Option<Vec<EntityTree>>,
}

impl EntityTree {
    pub fn file(path: impl Into<String>, content_hash: impl Into<String>, revision: RevisionId) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
            revision,
            children: None,
        }
    }

    pub fn is_collection(&self) -> bool {
        self.children.is_some()
    }

    /// Number of nodes in the tree, the root included.
    pub fn size(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(EntityTree::size)
            .sum::<usize>()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityArena {
    entities: Vec<Entity>,
    #[serde(skip)]
    index: HashMap<EntityKey, EntityIdx>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity, returning the existing slot when the identity is
    /// already present. The first inserted value wins.
    pub fn intern(&mut self, entity: Entity) -> EntityIdx {
        let key = entity.key();
        if let Some(idx) = self.index.get(&key) {
            return *idx;
        }
        let idx = EntityIdx(self.entities.len() as u32);
        self.entities.push(entity);
        self.index.insert(key, idx);
        idx
    }

    /// Add a member to a collection slot (no-op for duplicate members).
    pub fn push_member(&mut self, collection: EntityIdx, member: EntityIdx) {
        if let Some(Entity {
            kind: EntityKind::Collection { members },
            ..
        }) = self.entities.get_mut(collection.index())
        {
            if !members.contains(&member) {
                members.push(member);
            }
        }
    }

    /// Intern a resolved tree, sharing any node whose identity is already
    /// present.
    pub fn insert_tree(&mut self, tree: EntityTree) -> EntityIdx {
        let EntityTree {
            path,
            content_hash,
            revision,
            children,
        } = tree;
        let kind = match children {
            None => EntityKind::File,
            Some(_) => EntityKind::Collection { members: vec![] },
        };
        let idx = self.intern(Entity {
            path,
            content_hash,
            revision,
            kind,
        });
        for child in children.into_iter().flatten() {
            let member = self.insert_tree(child);
            if member != idx {
                self.push_member(idx, member);
            }
        }
        idx
    }

    pub fn get(&self, idx: EntityIdx) -> Option<&Entity> {
        self.entities.get(idx.index())
    }

    pub fn lookup(&self, key: &EntityKey) -> Option<EntityIdx> {
        self.index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityIdx, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityIdx(i as u32), e))
    }

    /// The entity at `root` followed by all of its transitive members,
    /// each visited once.
    pub fn walk(&self, root: EntityIdx) -> Vec<EntityIdx> {
        let mut out = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if !seen.insert(idx) {
                continue;
            }
            if let Some(entity) = self.get(idx) {
                out.push(idx);
                stack.extend(entity.members().iter().rev().copied());
            }
        }
        out
    }

    /// Rebuild the identity index (after deserialization).
    pub fn reindex(&mut self) {
        self.index = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key(), EntityIdx(i as u32)))
            .collect();
    }
}
