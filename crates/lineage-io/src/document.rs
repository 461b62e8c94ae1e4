//! Typed JSON documents for both graphs.
//!
//! A document is `{ "version": 1, "nodes": [...] }` where every node is
//! tagged by `"type"`. Cross-references are URIs built by `UriBuilder`.
//! Dependency edges are not stored: they are recomputed from plan patterns
//! on load.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use lineage_core::activity::{Activity, ActivityBuilder, Agent};
use lineage_core::entity::{Entity, EntityIdx, EntityTree};
use lineage_core::id::RevisionId;
use lineage_core::path::ContainmentPolicy;
use lineage_core::plan::{Argument, InputPattern, OutputPattern, Plan};
use lineage_core::uri::UriBuilder;
use lineage_graph::{DependencyGraph, ProvenanceGraph};

use crate::error::{Error, Result};

pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: u32,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Plan(PlanNode),
    Activity(ActivityNode),
    Usage(EdgeNode),
    Generation(EdgeNode),
    Entity(EntityNode),
    Collection(CollectionNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub id: String,
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub inputs: Vec<InputPattern>,
    #[serde(default)]
    pub outputs: Vec<OutputPattern>,
    pub success_codes: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityNode {
    pub id: String,
    pub order: u64,
    pub plan: String,
    pub path: String,
    #[serde(default)]
    pub agents: Vec<Agent>,
    pub started_ms: u64,
    pub ended_ms: u64,
    #[serde(default)]
    pub usages: Vec<String>,
    #[serde(default)]
    pub generations: Vec<String>,
    #[serde(default)]
    pub invalidated: Vec<String>,
}

/// A qualified usage or generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeNode {
    pub id: String,
    pub role: String,
    pub entity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub id: String,
    pub path: String,
    pub checksum: String,
    pub revision: RevisionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionNode {
    pub id: String,
    pub path: String,
    pub checksum: String,
    pub revision: RevisionId,
    #[serde(default)]
    pub members: Vec<String>,
}

impl Document {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            nodes,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let doc: Document = serde_json::from_slice(bytes)?;
        if doc.version != DOCUMENT_VERSION {
            return Err(Error::Document(format!(
                "unsupported document version {} (expected {DOCUMENT_VERSION})",
                doc.version
            )));
        }
        Ok(doc)
    }
}

pub fn dependency_document(graph: &DependencyGraph, uris: &UriBuilder) -> Document {
    let nodes = graph
        .plans()
        .iter()
        .map(|p| {
            Node::Plan(PlanNode {
                id: uris.plan(p.id),
                name: p.name.clone(),
                command: p.command.clone(),
                arguments: p.arguments.clone(),
                inputs: p.inputs.clone(),
                outputs: p.outputs.clone(),
                success_codes: p.success_codes.clone(),
            })
        })
        .collect();
    Document::new(nodes)
}

pub fn dependency_from_document(
    doc: &Document,
    uris: &UriBuilder,
    policy: ContainmentPolicy,
) -> Result<DependencyGraph> {
    let mut plans = Vec::new();
    for node in &doc.nodes {
        match node {
            Node::Plan(p) => plans.push(Plan {
                id: uris.parse_plan(&p.id)?,
                name: p.name.clone(),
                command: p.command.clone(),
                arguments: p.arguments.clone(),
                inputs: p.inputs.clone(),
                outputs: p.outputs.clone(),
                success_codes: p.success_codes.clone(),
            }),
            other => {
                return Err(Error::Document(format!(
                    "unexpected {} node in dependency document",
                    node_kind(other)
                )))
            }
        }
    }
    Ok(DependencyGraph::from_plans(plans, policy)?)
}

pub fn provenance_document(graph: &ProvenanceGraph, uris: &UriBuilder) -> Document {
    let mut nodes = Vec::new();
    let mut emitted: HashMap<String, RevisionId> = HashMap::new();

    for activity in graph.activities() {
        let activity_uri = uris.activity(activity.id);
        let mut edge_nodes = Vec::new();
        let mut entity_nodes = Vec::new();

        let mut usages = Vec::new();
        for usage in &activity.usages {
            let id = uris.usage(activity.id, &usage.role);
            let entity = emit_entity(activity, usage.entity, uris, &mut emitted, &mut entity_nodes);
            edge_nodes.push(Node::Usage(EdgeNode {
                id: id.clone(),
                role: usage.role.clone(),
                entity,
            }));
            usages.push(id);
        }

        let mut generations = Vec::new();
        for generation in &activity.generations {
            let id = uris.generation(activity.id, &generation.role);
            let entity =
                emit_entity(activity, generation.entity, uris, &mut emitted, &mut entity_nodes);
            edge_nodes.push(Node::Generation(EdgeNode {
                id: id.clone(),
                role: generation.role.clone(),
                entity,
            }));
            generations.push(id);
        }

        let invalidated = activity
            .invalidated
            .iter()
            .map(|&idx| emit_entity(activity, idx, uris, &mut emitted, &mut entity_nodes))
            .collect();

        nodes.push(Node::Activity(ActivityNode {
            id: activity_uri,
            order: activity.order,
            plan: uris.plan(activity.plan),
            path: activity.path.clone(),
            agents: activity.agents.clone(),
            started_ms: activity.started_ms,
            ended_ms: activity.ended_ms,
            usages,
            generations,
            invalidated,
        }));
        nodes.extend(edge_nodes);
        nodes.extend(entity_nodes);
    }
    Document::new(nodes)
}

/// Emit the node(s) for one arena entity, returning its URI. Files are
/// shared across the document unless their revision differs from the
/// shared node's; collections are scoped to their activity.
fn emit_entity(
    activity: &Activity,
    idx: EntityIdx,
    uris: &UriBuilder,
    emitted: &mut HashMap<String, RevisionId>,
    out: &mut Vec<Node>,
) -> String {
    let Some(entity) = activity.entity(idx) else {
        return String::new();
    };
    if !entity.is_collection() {
        let shared = uris.entity(&entity.content_hash, &entity.path);
        // Same content seen at another revision (a revert): keep this
        // activity's revision on a node of its own.
        let id = match emitted.get(&shared) {
            Some(revision) if *revision != entity.revision => {
                uris.activity_entity(activity.id, &entity.content_hash, &entity.path)
            }
            _ => shared,
        };
        if !emitted.contains_key(&id) {
            emitted.insert(id.clone(), entity.revision.clone());
            out.push(Node::Entity(EntityNode {
                id: id.clone(),
                path: entity.path.clone(),
                checksum: entity.content_hash.clone(),
                revision: entity.revision.clone(),
            }));
        }
        return id;
    }

    let id = uris.activity_entity(activity.id, &entity.content_hash, &entity.path);
    if emitted.contains_key(&id) {
        return id;
    }
    emitted.insert(id.clone(), entity.revision.clone());
    let members = entity
        .members()
        .iter()
        .map(|&m| emit_entity(activity, m, uris, emitted, out))
        .collect();
    out.push(Node::Collection(CollectionNode {
        id: id.clone(),
        path: entity.path.clone(),
        checksum: entity.content_hash.clone(),
        revision: entity.revision.clone(),
        members,
    }));
    id
}

pub fn provenance_from_document(doc: &Document, uris: &UriBuilder) -> Result<ProvenanceGraph> {
    let mut edges: HashMap<&str, &EdgeNode> = HashMap::new();
    let mut entities: HashMap<&str, &Node> = HashMap::new();
    let mut activities = Vec::new();

    for node in &doc.nodes {
        match node {
            Node::Activity(a) => activities.push(a),
            Node::Usage(e) | Node::Generation(e) => {
                edges.insert(e.id.as_str(), e);
            }
            Node::Entity(e) => {
                entities.insert(e.id.as_str(), node);
            }
            Node::Collection(c) => {
                entities.insert(c.id.as_str(), node);
            }
            Node::Plan(_) => {
                return Err(Error::Document(
                    "unexpected Plan node in provenance document".into(),
                ))
            }
        }
    }

    let lookup = Lookup { edges, entities };
    let mut rebuilt = Vec::with_capacity(activities.len());
    for a in activities {
        let mut builder = ActivityBuilder::new(uris.parse_plan(&a.plan)?, a.path.clone())
            .id(uris.parse_activity(&a.id)?)
            .agents(a.agents.clone())
            .times(a.started_ms, a.ended_ms);
        for uri in &a.usages {
            let edge = lookup.edge(uri)?;
            builder.add_usage(lookup.tree(&edge.entity, &mut HashSet::new())?, &edge.role)?;
        }
        for uri in &a.generations {
            let edge = lookup.edge(uri)?;
            builder.add_generation(lookup.tree(&edge.entity, &mut HashSet::new())?, &edge.role)?;
        }
        for uri in &a.invalidated {
            let tree = lookup.tree(uri, &mut HashSet::new())?;
            builder.add_invalidation(Entity::file(tree.path, tree.content_hash, tree.revision));
        }
        rebuilt.push(builder.build().with_order(a.order));
    }
    Ok(ProvenanceGraph::from_activities(rebuilt)?)
}

struct Lookup<'d> {
    edges: HashMap<&'d str, &'d EdgeNode>,
    entities: HashMap<&'d str, &'d Node>,
}

impl<'d> Lookup<'d> {
    fn edge(&self, uri: &str) -> Result<&'d EdgeNode> {
        self.edges
            .get(uri)
            .copied()
            .ok_or_else(|| Error::Document(format!("dangling reference {uri}")))
    }

    fn tree(&self, uri: &str, visiting: &mut HashSet<String>) -> Result<EntityTree> {
        if !visiting.insert(uri.to_string()) {
            return Err(Error::Document(format!("collection {uri} contains itself")));
        }
        let tree = match self.entities.get(uri) {
            Some(Node::Entity(e)) => EntityTree::file(e.path.clone(), e.checksum.clone(), e.revision.clone()),
            Some(Node::Collection(c)) => {
                let mut children = Vec::with_capacity(c.members.len());
                for member in &c.members {
                    children.push(self.tree(member, visiting)?);
                }
                EntityTree {
                    path: c.path.clone(),
                    content_hash: c.checksum.clone(),
                    revision: c.revision.clone(),
                    children: Some(children),
                }
            }
            _ => return Err(Error::Document(format!("dangling reference {uri}"))),
        };
        visiting.remove(uri);
        Ok(tree)
    }
}

fn node_kind(node: &Node) -> &'static str {
    match node {
        Node::Plan(_) => "Plan",
        Node::Activity(_) => "Activity",
        Node::Usage(_) => "Usage",
        Node::Generation(_) => "Generation",
        Node::Entity(_) => "Entity",
        Node::Collection(_) => "Collection",
    }
}
