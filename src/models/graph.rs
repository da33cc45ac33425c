//! Graph algorithms for task dependency analysis.
//!
//! This module provides cycle detection over a resolved dependency graph.
//! The graph is built from the union of the existing manifest and any batch
//! being ingested, so cycles that span the two are caught before commit.

use std::collections::{HashMap, HashSet};

/// A directed dependency graph with insertion-ordered nodes.
///
/// Node order matters: traversal starts from every node in insertion order,
/// which makes the reported cycle deterministic for a given input.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node ids in insertion order
    order: Vec<String>,

    /// Outgoing edges (task id -> ids it depends on)
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with its outgoing dependency edges.
    ///
    /// Re-adding an id replaces its edges without duplicating the node.
    pub fn add_node(&mut self, id: impl Into<String>, deps: Vec<String>) {
        let id = id.into();
        if !self.edges.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.edges.insert(id, deps);
    }

    /// Get the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Find a dependency cycle, if any exists.
    ///
    /// Runs a depth-first traversal from every node in insertion order,
    /// keeping the set of nodes on the current path. The smallest cycle
    /// found is returned, with ties broken by traversal order. A task that
    /// depends on itself is a cycle of length one. Edges to ids not present
    /// in the graph are ignored.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut best: Option<Vec<String>> = None;

        for root in &self.order {
            if let Some(cycle) = self.cycle_from(root) {
                let smaller = best
                    .as_ref()
                    .map(|b| cycle.len() < b.len())
                    .unwrap_or(true);
                if smaller {
                    best = Some(cycle);
                }
            }
        }

        best
    }

    /// DFS from a single root, returning the first cycle encountered.
    fn cycle_from(&self, root: &str) -> Option<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut path: Vec<&str> = Vec::new();
        // (node, index of next neighbor to try)
        let mut stack: Vec<(&str, usize)> = Vec::new();

        visited.insert(root);
        on_path.insert(root);
        path.push(root);
        stack.push((root, 0));

        while let Some(&(node, idx)) = stack.last() {
            let neighbors = self
                .edges
                .get(node)
                .map(|v| v.as_slice())
                .unwrap_or_default();

            if idx < neighbors.len() {
                stack.last_mut().unwrap().1 += 1;
                let next = neighbors[idx].as_str();

                // Edges into nodes outside the graph cannot close a cycle
                if !self.edges.contains_key(next) {
                    continue;
                }

                if on_path.contains(next) {
                    let pos = path.iter().position(|&n| n == next).unwrap();
                    return Some(path[pos..].iter().map(|s| s.to_string()).collect());
                }

                if visited.contains(next) {
                    continue;
                }

                visited.insert(next);
                on_path.insert(next);
                path.push(next);
                stack.push((next, 0));
            } else {
                stack.pop();
                path.pop();
                on_path.remove(node);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[(&str, &[&str])]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (id, deps) in nodes {
            g.add_node(*id, deps.iter().map(|s| s.to_string()).collect());
        }
        g
    }

    #[test]
    fn test_empty_graph_has_no_cycle() {
        let g = DependencyGraph::new();
        assert!(g.is_empty());
        assert_eq!(g.find_cycle(), None);
    }

    #[test]
    fn test_dag_has_no_cycle() {
        let g = graph(&[
            ("TASK-001", &[]),
            ("TASK-002", &["TASK-001"]),
            ("TASK-003", &["TASK-001", "TASK-002"]),
        ]);
        assert_eq!(g.find_cycle(), None);
    }

    #[test]
    fn test_direct_cycle() {
        let g = graph(&[("TASK-001", &["TASK-002"]), ("TASK-002", &["TASK-001"])]);
        let cycle = g.find_cycle().unwrap();
        assert_eq!(cycle.len(), 2);
        assert!(cycle.contains(&"TASK-001".to_string()));
        assert!(cycle.contains(&"TASK-002".to_string()));
    }

    #[test]
    fn test_transitive_cycle() {
        let g = graph(&[
            ("TASK-001", &["TASK-003"]),
            ("TASK-002", &["TASK-001"]),
            ("TASK-003", &["TASK-002"]),
        ]);
        let cycle = g.find_cycle().unwrap();
        assert_eq!(cycle.len(), 3);
    }

    #[test]
    fn test_self_dependency_is_length_one_cycle() {
        let g = graph(&[("TASK-001", &["TASK-001"])]);
        assert_eq!(g.find_cycle(), Some(vec!["TASK-001".to_string()]));
    }

    #[test]
    fn test_smallest_cycle_reported() {
        // A 3-cycle appears before a 2-cycle in insertion order; the
        // smaller cycle still wins.
        let g = graph(&[
            ("TASK-001", &["TASK-002"]),
            ("TASK-002", &["TASK-003"]),
            ("TASK-003", &["TASK-001"]),
            ("TASK-004", &["TASK-005"]),
            ("TASK-005", &["TASK-004"]),
        ]);
        let cycle = g.find_cycle().unwrap();
        assert_eq!(cycle.len(), 2);
        assert!(cycle.contains(&"TASK-004".to_string()));
    }

    #[test]
    fn test_deterministic_cycle_for_equal_sizes() {
        let g = graph(&[
            ("TASK-001", &["TASK-002"]),
            ("TASK-002", &["TASK-001"]),
            ("TASK-003", &["TASK-004"]),
            ("TASK-004", &["TASK-003"]),
        ]);
        // First cycle in insertion order wins the tie.
        let cycle = g.find_cycle().unwrap();
        assert_eq!(cycle, vec!["TASK-001".to_string(), "TASK-002".to_string()]);
    }

    #[test]
    fn test_cycle_spanning_existing_and_new() {
        // An existing task depending on a new one which depends back on it
        // is only detectable in the union graph.
        let g = graph(&[
            ("TASK-001", &["TASK-003"]),
            ("TASK-002", &[]),
            ("TASK-003", &["TASK-001"]),
        ]);
        let cycle = g.find_cycle().unwrap();
        assert_eq!(cycle.len(), 2);
        assert!(cycle.contains(&"TASK-001".to_string()));
        assert!(cycle.contains(&"TASK-003".to_string()));
    }

    #[test]
    fn test_dangling_edge_ignored() {
        let g = graph(&[("TASK-001", &["TASK-999"])]);
        assert_eq!(g.find_cycle(), None);
    }

    #[test]
    fn test_readding_node_replaces_edges() {
        let mut g = graph(&[("TASK-001", &["TASK-002"]), ("TASK-002", &["TASK-001"])]);
        assert!(g.find_cycle().is_some());

        g.add_node("TASK-002", vec![]);
        assert_eq!(g.len(), 2);
        assert_eq!(g.find_cycle(), None);
    }
}
