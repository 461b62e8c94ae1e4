//! Plan dependency graph.
//!
//! Nodes are Plans; an edge `A -> B` exists iff some output pattern of `A`
//! contains some input pattern of `B` under the configured
//! `ContainmentPolicy`. Edges are always derived from patterns, never stored
//! independently, and the graph is kept acyclic: an insertion that would
//! close a cycle is rejected before anything is mutated.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use lineage_core::error::{Error, Result};
use lineage_core::id::PlanId;
use lineage_core::path::{contains, normalize, ContainmentPolicy};
use lineage_core::plan::Plan;
use tracing::debug;

use crate::verify;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    plans: Vec<Plan>,
    index: HashMap<PlanId, usize>,
    /// Outgoing adjacency, by node index.
    out: Vec<Vec<usize>>,
    edge_count: usize,
    policy: ContainmentPolicy,
}

impl DependencyGraph {
    pub fn new(policy: ContainmentPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Rebuild a graph from persisted plans, recomputing every edge.
    pub fn from_plans(plans: Vec<Plan>, policy: ContainmentPolicy) -> Result<Self> {
        let mut graph = Self::new(policy);
        for plan in plans {
            if graph.index.contains_key(&plan.id) {
                return Err(Error::GraphCorruption(format!(
                    "duplicate plan id {}",
                    plan.id
                )));
            }
            let idx = graph.plans.len();
            graph.index.insert(plan.id, idx);
            graph.plans.push(plan);
            graph.out.push(Vec::new());
        }

        let n = graph.plans.len();
        for from in 0..n {
            for to in 0..n {
                if from != to && connects(&graph.plans[from], &graph.plans[to], policy) {
                    graph.out[from].push(to);
                    graph.edge_count += 1;
                }
            }
        }
        verify::assert_acyclic(n, &graph.edge_list(), |i| graph.plans[i].id.to_string())?;
        Ok(graph)
    }

    pub fn policy(&self) -> ContainmentPolicy {
        self.policy
    }

    /// Register a plan, returning the id of the canonical node.
    ///
    /// A structurally similar plan already in the graph wins and its id is
    /// returned unchanged. Otherwise the plan is inserted (with a fresh id if
    /// its own collides with a distinct plan) and connected to every other
    /// node. `GraphCorruption` if the new edges would close a cycle; the
    /// graph is left untouched in that case.
    pub fn add(&mut self, plan: Plan) -> Result<PlanId> {
        if let Some(existing) = self.find_similar(&plan) {
            debug!(plan = %existing.id, command = %plan.command, "reusing similar plan");
            return Ok(existing.id);
        }

        let mut plan = plan;
        while self.index.contains_key(&plan.id) {
            plan = plan.with_id(PlanId::generate());
        }

        let new = self.plans.len();
        let mut incoming = Vec::new();
        let mut outgoing = Vec::new();
        for (i, other) in self.plans.iter().enumerate() {
            if connects(other, &plan, self.policy) {
                incoming.push(i);
            }
            if connects(&plan, other, self.policy) {
                outgoing.push(i);
            }
        }

        let mut candidate = self.edge_list();
        candidate.extend(incoming.iter().map(|&i| (i, new)));
        candidate.extend(outgoing.iter().map(|&o| (new, o)));
        verify::assert_acyclic(new + 1, &candidate, |i| {
            self.plans
                .get(i)
                .map(|p| p.id)
                .unwrap_or(plan.id)
                .to_string()
        })?;

        let id = plan.id;
        debug!(
            plan = %id,
            command = %plan.command,
            incoming = incoming.len(),
            outgoing = outgoing.len(),
            "registered plan"
        );
        self.index.insert(id, new);
        self.plans.push(plan);
        self.out.push(outgoing.clone());
        for i in &incoming {
            self.out[*i].push(new);
        }
        self.edge_count += incoming.len() + outgoing.len();
        Ok(id)
    }

    pub fn get(&self, id: PlanId) -> Option<&Plan> {
        self.index.get(&id).map(|&i| &self.plans[i])
    }

    pub fn find_similar(&self, plan: &Plan) -> Option<&Plan> {
        self.plans.iter().find(|p| p.is_similar_to(plan))
    }

    /// Plans in insertion order.
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn node_count(&self) -> usize {
        self.plans.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn successors(&self, id: PlanId) -> Vec<PlanId> {
        self.index
            .get(&id)
            .map(|&i| self.out[i].iter().map(|&j| self.plans[j].id).collect())
            .unwrap_or_default()
    }

    /// Kahn topological order; ties resolve by insertion order.
    pub fn topological_order(&self) -> Vec<PlanId> {
        let n = self.plans.len();
        let mut indegree = vec![0usize; n];
        for targets in &self.out {
            for &t in targets {
                indegree[t] += 1;
            }
        }
        let mut ready: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_front() {
            order.push(self.plans[i].id);
            let mut next: Vec<usize> = self.out[i].clone();
            next.sort_unstable();
            for t in next {
                indegree[t] -= 1;
                if indegree[t] == 0 {
                    ready.push_back(t);
                }
            }
        }
        order
    }

    /// Every output path reachable from the plans that consume `changed`.
    pub fn downstream_paths(&self, changed: &str) -> BTreeSet<String> {
        let changed = normalize(changed);
        let start: Vec<usize> = self
            .plans
            .iter()
            .enumerate()
            .filter(|(_, p)| self.consumes(p, &changed))
            .map(|(i, _)| i)
            .collect();
        self.collect_outputs(start)
    }

    /// Like `downstream_paths`, starting only from `plan` (empty when that
    /// plan does not consume `changed`).
    pub fn downstream_paths_of(&self, plan: PlanId, changed: &str) -> BTreeSet<String> {
        let changed = normalize(changed);
        match self.index.get(&plan) {
            Some(&i) if self.consumes(&self.plans[i], &changed) => self.collect_outputs(vec![i]),
            _ => BTreeSet::new(),
        }
    }

    fn consumes(&self, plan: &Plan, path: &str) -> bool {
        plan.input_paths().any(|input| contains(input, path, self.policy))
    }

    fn collect_outputs(&self, start: Vec<usize>) -> BTreeSet<String> {
        let mut seen: HashSet<usize> = start.iter().copied().collect();
        let mut queue: VecDeque<usize> = start.into_iter().collect();
        let mut paths = BTreeSet::new();
        while let Some(i) = queue.pop_front() {
            paths.extend(self.plans[i].output_paths().map(str::to_string));
            for &next in &self.out[i] {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        paths
    }

    fn edge_list(&self) -> Vec<(usize, usize)> {
        self.out
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| targets.iter().map(move |&to| (from, to)))
            .collect()
    }
}

/// Whether an output of `from` feeds an input of `to`.
fn connects(from: &Plan, to: &Plan, policy: ContainmentPolicy) -> bool {
    from.output_paths()
        .any(|out| to.input_paths().any(|input| contains(out, input, policy)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::plan::{InputPattern, OutputPattern};

    fn plan(command: &str, ins: &[&str], outs: &[&str]) -> Plan {
        Plan::new(
            command,
            vec![],
            ins.iter().map(|p| InputPattern::new(p)).collect(),
            outs.iter().map(|p| OutputPattern::new(p)).collect(),
            vec![],
        )
    }

    #[test]
    fn directory_output_feeds_nested_input() {
        let mut g = DependencyGraph::default();
        let a = g.add(plan("fetch", &[], &["data/"])).unwrap();
        let b = g.add(plan("clean", &["data/raw.csv"], &["clean.csv"])).unwrap();
        let c = g.add(plan("other", &["other/raw.csv"], &["o.csv"])).unwrap();
        assert_eq!(g.successors(a), vec![b]);
        assert!(g.successors(c).is_empty());
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn exact_policy_ignores_directory_containment() {
        let mut g = DependencyGraph::new(ContainmentPolicy::Exact);
        g.add(plan("fetch", &[], &["data"])).unwrap();
        g.add(plan("clean", &["data/raw.csv"], &["clean.csv"])).unwrap();
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn edges_are_added_in_both_directions() {
        let mut g = DependencyGraph::default();
        let b = g.add(plan("clean", &["raw.csv"], &["clean.csv"])).unwrap();
        let a = g.add(plan("fetch", &[], &["raw.csv"])).unwrap();
        assert_eq!(g.successors(a), vec![b]);
        assert_eq!(g.topological_order(), vec![a, b]);
    }

    #[test]
    fn similar_plans_are_deduplicated() {
        let mut g = DependencyGraph::default();
        let first = g.add(plan("clean", &["raw.csv"], &["clean.csv"])).unwrap();
        g.add(plan("train", &["clean.csv"], &["model.bin"])).unwrap();
        let (nodes, edges) = (g.node_count(), g.edge_count());
        let again = g.add(plan("clean", &["./raw.csv"], &["clean.csv"])).unwrap();
        assert_eq!(first, again);
        assert_eq!((g.node_count(), g.edge_count()), (nodes, edges));
    }

    #[test]
    fn colliding_id_is_regenerated() {
        let mut g = DependencyGraph::default();
        let a = plan("one", &["x"], &["y"]);
        let id = a.id;
        g.add(a).unwrap();
        let b = plan("two", &["y"], &["z"]).with_id(id);
        let new_id = g.add(b).unwrap();
        assert_ne!(new_id, id);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn cycle_is_rejected_and_graph_unchanged() {
        let mut g = DependencyGraph::default();
        g.add(plan("a", &["x"], &["y"])).unwrap();
        g.add(plan("b", &["y"], &["z"])).unwrap();
        let err = g.add(plan("c", &["z"], &["x"])).unwrap_err();
        assert!(matches!(err, Error::GraphCorruption(_)));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn in_place_rewrite_has_no_self_edge() {
        let mut g = DependencyGraph::default();
        g.add(plan("sort", &["data.csv"], &["data.csv"])).unwrap();
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn downstream_follows_multi_hop_chains() {
        let mut g = DependencyGraph::default();
        g.add(plan("a", &["in.txt"], &["a.out"])).unwrap();
        let b = g.add(plan("b", &["a.out"], &["b.out"])).unwrap();
        g.add(plan("c", &["b.out"], &["c.out"])).unwrap();

        let paths = g.downstream_paths("a.out");
        assert_eq!(
            paths.into_iter().collect::<Vec<_>>(),
            vec!["b.out".to_string(), "c.out".to_string()]
        );
        assert_eq!(g.downstream_paths("in.txt").len(), 3);
        assert_eq!(g.downstream_paths_of(b, "a.out").len(), 2);
        assert!(g.downstream_paths_of(b, "in.txt").is_empty());
        assert!(g.downstream_paths("unrelated").is_empty());
    }

    #[test]
    fn rebuild_from_plans_recomputes_edges() {
        let mut g = DependencyGraph::default();
        g.add(plan("a", &["in"], &["mid"])).unwrap();
        g.add(plan("b", &["mid"], &["out"])).unwrap();
        let rebuilt =
            DependencyGraph::from_plans(g.plans().to_vec(), ContainmentPolicy::Ancestor).unwrap();
        assert_eq!(rebuilt.edge_count(), g.edge_count());
        assert_eq!(rebuilt.topological_order(), g.topological_order());

        let mut dup = g.plans().to_vec();
        dup.push(dup[0].clone());
        assert!(DependencyGraph::from_plans(dup, ContainmentPolicy::Ancestor).is_err());
    }
}
