//! # Directed graph over system identities with stable topological ordering.
//!
//! Nodes are system ids within one kind; edges are must-run-before
//! constraints. `Before(a, b)` is stored as edge `a → b`; `After(a, b)` is
//! normalized to `b → a` at insertion, so the sort only ever sees one
//! direction.
//!
//! ## Ordering rules
//! - Among nodes with no unresolved predecessors, the lowest numeric
//!   priority runs next (lower = earlier).
//! - Priority ties break by registration order (first registered wins), so
//!   the output is deterministic across runs and idempotent across rebuilds.
//! - A cycle is a configuration bug: the error names **every** id on the
//!   cycle, not just the one that closed it.
//! - An edge whose endpoint was never registered is accepted at insertion
//!   (declaration order between plugins must not matter) but is a hard error
//!   once an order is built while the endpoint is still missing.
//!
//! ## Example
//! ```
//! use systemvisor::{DependencyGraph, Direction, SystemId};
//!
//! let mut g = DependencyGraph::new();
//! g.insert("physics".into(), 0);
//! g.insert("render".into(), 0);
//! g.add_edge(&"render".into(), "physics".into(), Direction::After);
//!
//! let order = g.build_order().unwrap();
//! assert_eq!(order, vec![SystemId::from("physics"), SystemId::from("render")]);
//! ```

use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::ConfigError;
use crate::world::SystemId;

/// Which side of the target a system wants to run on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// The declaring system must run before the target.
    Before,
    /// The declaring system must run after the target.
    After,
}

/// One declared dependency edge, as supplied at registration.
#[derive(Clone, Debug)]
pub struct Dependency {
    /// The system the edge points at.
    pub target: SystemId,
    /// Desired position relative to the target.
    pub direction: Direction,
}

impl Dependency {
    /// Declares "run before `target`".
    pub fn before(target: impl Into<SystemId>) -> Self {
        Self {
            target: target.into(),
            direction: Direction::Before,
        }
    }

    /// Declares "run after `target`".
    pub fn after(target: impl Into<SystemId>) -> Self {
        Self {
            target: target.into(),
            direction: Direction::After,
        }
    }
}

#[derive(Clone, Debug)]
struct Node {
    priority: i32,
    /// Monotonic registration sequence; the tie-break and the determinism
    /// anchor. Survives removals of other nodes.
    seq: u64,
}

/// Normalized must-run-before edge, tagged with the declaring system so that
/// unregistering a system drops exactly the edges it declared.
#[derive(Clone, Debug)]
struct Edge {
    owner: SystemId,
    from: SystemId,
    to: SystemId,
}

/// Directed dependency graph with stable priority-ordered topological sort.
#[derive(Default)]
pub struct DependencyGraph {
    nodes: HashMap<SystemId, Node>,
    edges: Vec<Edge>,
    next_seq: u64,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node. A re-inserted id keeps its original sequence position.
    pub fn insert(&mut self, id: SystemId, priority: i32) {
        let seq = self.next_seq;
        let entry = self.nodes.entry(id).or_insert(Node { priority, seq });
        if entry.seq == seq {
            self.next_seq += 1;
        } else {
            entry.priority = priority;
        }
    }

    /// Removes a node and every edge it declared.
    ///
    /// Edges declared by other systems that point at `id` stay behind as
    /// dangling edges; they error again at order-build time until the target
    /// reappears.
    pub fn remove(&mut self, id: &SystemId) {
        self.nodes.remove(id);
        self.edges.retain(|e| &e.owner != id);
    }

    /// Adds an edge declared by `owner`, normalized to must-run-before.
    pub fn add_edge(&mut self, owner: &SystemId, target: SystemId, direction: Direction) {
        let (from, to) = match direction {
            Direction::Before => (owner.clone(), target),
            Direction::After => (target, owner.clone()),
        };
        self.edges.push(Edge {
            owner: owner.clone(),
            from,
            to,
        });
    }

    /// True if the id is registered.
    pub fn contains(&self, id: &SystemId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Builds the total execution order.
    ///
    /// Fails with [`ConfigError::UnresolvedDependency`] if any edge endpoint
    /// is missing, or [`ConfigError::DependencyCycle`] naming every id on the
    /// cycle if no valid order exists.
    pub fn build_order(&self) -> Result<Vec<SystemId>, ConfigError> {
        self.sort(false)
    }

    /// Cycle check over edges whose both endpoints exist.
    ///
    /// Used at registration time, where dangling edges are still legal.
    /// Returns the ids on the cycle, if any.
    pub fn detect_cycle(&self) -> Option<Vec<SystemId>> {
        match self.sort(true) {
            Err(ConfigError::DependencyCycle { ids }) => Some(ids),
            _ => None,
        }
    }

    fn sort(&self, skip_unresolved: bool) -> Result<Vec<SystemId>, ConfigError> {
        // Stable index assignment: registration order.
        let mut ids: Vec<&SystemId> = self.nodes.keys().collect();
        ids.sort_by_key(|id| self.nodes[*id].seq);
        let pos: HashMap<&SystemId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let n = ids.len();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree: Vec<usize> = vec![0; n];
        let mut seen: HashSet<(usize, usize)> = HashSet::new();

        for edge in &self.edges {
            match (pos.get(&edge.from), pos.get(&edge.to)) {
                (Some(&f), Some(&t)) => {
                    // Duplicate declarations collapse to one constraint.
                    if f != t && seen.insert((f, t)) {
                        successors[f].push(t);
                        in_degree[t] += 1;
                    }
                }
                (missing_from, _) if !skip_unresolved => {
                    let missing = if missing_from.is_none() {
                        edge.from.clone()
                    } else {
                        edge.to.clone()
                    };
                    return Err(ConfigError::UnresolvedDependency {
                        system: edge.owner.clone(),
                        missing,
                    });
                }
                _ => {}
            }
        }

        // Kahn's algorithm; the ready set is a min-heap on (priority, seq).
        let mut ready = BinaryHeap::new();
        for (i, id) in ids.iter().enumerate() {
            if in_degree[i] == 0 {
                let node = &self.nodes[*id];
                ready.push(std::cmp::Reverse((node.priority, node.seq, i)));
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut placed = vec![false; n];
        while let Some(std::cmp::Reverse((_, _, i))) = ready.pop() {
            placed[i] = true;
            order.push(ids[i].clone());
            for &next in &successors[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    let node = &self.nodes[ids[next]];
                    ready.push(std::cmp::Reverse((node.priority, node.seq, next)));
                }
            }
        }

        if order.len() == n {
            return Ok(order);
        }
        Err(ConfigError::DependencyCycle {
            ids: self.cycle_members(&ids, &successors, &placed),
        })
    }

    /// Narrows the unplaced remainder down to the nodes actually on cycles by
    /// iteratively stripping nodes with no remaining predecessors or no
    /// remaining successors.
    fn cycle_members(
        &self,
        ids: &[&SystemId],
        successors: &[Vec<usize>],
        placed: &[bool],
    ) -> Vec<SystemId> {
        let n = ids.len();
        let mut remaining: HashSet<usize> = (0..n).filter(|&i| !placed[i]).collect();

        loop {
            let mut drop: Vec<usize> = Vec::new();
            for &i in &remaining {
                let has_succ = successors[i].iter().any(|t| remaining.contains(t));
                let has_pred = remaining
                    .iter()
                    .any(|&p| p != i && successors[p].contains(&i));
                if !has_succ || !has_pred {
                    drop.push(i);
                }
            }
            if drop.is_empty() {
                break;
            }
            for i in drop {
                remaining.remove(&i);
            }
        }

        let mut members: Vec<usize> = remaining.into_iter().collect();
        members.sort_unstable();
        members.into_iter().map(|i| ids[i].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SystemId {
        SystemId::from(s)
    }

    #[test]
    fn test_priority_order_without_edges() {
        let mut g = DependencyGraph::new();
        g.insert(id("c"), 5);
        g.insert(id("a"), -1);
        g.insert(id("b"), 5);

        let order = g.build_order().unwrap();
        // ascending priority; ties by registration order (c before b)
        assert_eq!(order, vec![id("a"), id("c"), id("b")]);
        // idempotent rebuild
        assert_eq!(g.build_order().unwrap(), order);
    }

    #[test]
    fn test_edges_override_priority() {
        let mut g = DependencyGraph::new();
        g.insert(id("late"), 0);
        g.insert(id("early"), 100);
        g.add_edge(&id("early"), id("late"), Direction::Before);

        let order = g.build_order().unwrap();
        assert_eq!(order, vec![id("early"), id("late")]);
    }

    #[test]
    fn test_after_normalizes_to_before() {
        let mut g = DependencyGraph::new();
        g.insert(id("x"), 0);
        g.insert(id("y"), -10);
        g.add_edge(&id("y"), id("x"), Direction::After);

        let order = g.build_order().unwrap();
        assert_eq!(order, vec![id("x"), id("y")]);
    }

    #[test]
    fn test_order_is_permutation_respecting_all_edges() {
        let mut g = DependencyGraph::new();
        for (name, prio) in [("a", 3), ("b", 1), ("c", 2), ("d", 0), ("e", 9)] {
            g.insert(id(name), prio);
        }
        g.add_edge(&id("a"), id("b"), Direction::Before);
        g.add_edge(&id("c"), id("b"), Direction::After);
        g.add_edge(&id("e"), id("d"), Direction::Before);

        let order = g.build_order().unwrap();
        assert_eq!(order.len(), 5);
        let at = |s: &str| order.iter().position(|x| x == &id(s)).unwrap();
        assert!(at("a") < at("b"));
        assert!(at("b") < at("c"));
        assert!(at("e") < at("d"));
    }

    #[test]
    fn test_cycle_reports_every_member() {
        let mut g = DependencyGraph::new();
        for name in ["a", "b", "c", "tail"] {
            g.insert(id(name), 0);
        }
        g.add_edge(&id("a"), id("b"), Direction::Before);
        g.add_edge(&id("b"), id("c"), Direction::Before);
        g.add_edge(&id("c"), id("a"), Direction::Before);
        // downstream of the cycle, but not on it
        g.add_edge(&id("tail"), id("c"), Direction::After);

        match g.build_order() {
            Err(ConfigError::DependencyCycle { ids }) => {
                assert_eq!(ids, vec![id("a"), id("b"), id("c")]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!(g.detect_cycle(), Some(vec![id("a"), id("b"), id("c")]));
    }

    #[test]
    fn test_unresolved_edge_is_hard_error() {
        let mut g = DependencyGraph::new();
        g.insert(id("a"), 0);
        g.add_edge(&id("a"), id("ghost"), Direction::Before);

        match g.build_order() {
            Err(ConfigError::UnresolvedDependency { system, missing }) => {
                assert_eq!(system, id("a"));
                assert_eq!(missing, id("ghost"));
            }
            other => panic!("expected unresolved dependency, got {other:?}"),
        }
        // registration-time cycle check tolerates the dangling edge
        assert_eq!(g.detect_cycle(), None);

        // once the target appears, the edge is honored
        g.insert(id("ghost"), -100);
        let order = g.build_order().unwrap();
        assert_eq!(order, vec![id("a"), id("ghost")]);
    }

    #[test]
    fn test_remove_drops_owned_edges_only() {
        let mut g = DependencyGraph::new();
        g.insert(id("a"), 0);
        g.insert(id("b"), 0);
        g.add_edge(&id("a"), id("b"), Direction::Before);
        g.add_edge(&id("b"), id("a"), Direction::After); // b after a, same constraint

        g.remove(&id("a"));
        // b's edge at the removed node dangles again
        assert!(matches!(
            g.build_order(),
            Err(ConfigError::UnresolvedDependency { .. })
        ));

        g.remove(&id("b"));
        assert!(g.is_empty());
        assert_eq!(g.build_order().unwrap(), Vec::<SystemId>::new());
    }
}
