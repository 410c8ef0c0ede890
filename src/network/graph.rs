//! A small directed graph over notation identifiers.
//!
//! The conversion network needs little graph machinery: membership,
//! reachability, and BFS shortest paths with deterministic tie-breaks.
//! Adjacency lists keep insertion order, so path resolution is stable
//! across runs for the same registration order.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

/// A directed graph with `String`-labelled nodes.
#[derive(Debug, Clone, Default)]
pub struct DiGraph {
    nodes: Vec<String>,
    successors: FxHashMap<String, Vec<String>>,
}

impl DiGraph {
    /// An empty graph.
    pub fn new() -> Self {
        DiGraph::default()
    }

    /// Remove every node and edge.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.successors.clear();
    }

    /// Add a node; a no-op if it already exists.
    pub fn add_node(&mut self, node: impl Into<String>) {
        let node = node.into();
        if !self.successors.contains_key(&node) {
            self.successors.insert(node.clone(), Vec::new());
            self.nodes.push(node);
        }
    }

    /// Add a directed edge, creating missing endpoints.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let (from, to) = (from.into(), to.into());
        self.add_node(from.clone());
        self.add_node(to.clone());
        if let Some(succ) = self.successors.get_mut(&from) {
            if !succ.contains(&to) {
                succ.push(to);
            }
        }
    }

    /// True when `node` is in the graph.
    pub fn contains(&self, node: &str) -> bool {
        self.successors.contains_key(node)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// All edges, grouped by source node in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.iter().flat_map(move |u| {
            self.successors[u]
                .iter()
                .map(move |v| (u.as_str(), v.as_str()))
        })
    }

    /// Direct successors of `node`, in insertion order.
    pub fn successors(&self, node: &str) -> &[String] {
        self.successors.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every node reachable from `node`, excluding itself, in BFS
    /// order.
    pub fn descendants(&self, node: &str) -> Vec<String> {
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        visited.insert(node);
        let mut queue: VecDeque<&str> = VecDeque::from([node]);
        let mut found = Vec::new();
        while let Some(u) = queue.pop_front() {
            for v in self.successors(u) {
                if visited.insert(v) {
                    found.push(v.clone());
                    queue.push_back(v);
                }
            }
        }
        found
    }

    /// True when `to` is reachable from `from`.
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        from == to && self.contains(from)
            || self.descendants(from).iter().any(|n| n == to)
    }

    /// Shortest path from `from` to `to` by edge count, as the node
    /// sequence including both endpoints. BFS over insertion-ordered
    /// adjacency makes ties deterministic. `None` when unreachable or
    /// when either endpoint is missing.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        if from == to {
            return Some(vec![from.to_string()]);
        }
        let mut predecessor: FxHashMap<&str, &str> = FxHashMap::default();
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        visited.insert(from);
        let mut queue: VecDeque<&str> = VecDeque::from([from]);
        while let Some(u) = queue.pop_front() {
            for v in self.successors(u) {
                if !visited.insert(v.as_str()) {
                    continue;
                }
                predecessor.insert(v, u);
                if v == to {
                    let mut path = vec![v.as_str()];
                    let mut current = v.as_str();
                    while let Some(&p) = predecessor.get(current) {
                        path.push(p);
                        current = p;
                    }
                    path.reverse();
                    return Some(path.into_iter().map(String::from).collect());
                }
                queue.push_back(v);
            }
        }
        None
    }
}
