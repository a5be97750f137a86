//! Dependency graph management using `petgraph`.
//!
//! Builds a directed acyclic graph from the references between resources
//! and resolves the order in which the apply target must create them.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use stackwire_common::error::{Result, StackwireError};

/// A dependency graph of resources keyed by logical id.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Internal petgraph representation.
    graph: petgraph::Graph<String, ()>,
    /// Logical id to node lookup.
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Adds a resource node, returning the existing node if already present.
    pub fn add_resource(&mut self, id: impl Into<String>) -> NodeIndex {
        let id = id.into();
        if let Some(&idx) = self.nodes.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        let _ = self.nodes.insert(id, idx);
        idx
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    ///
    /// # Errors
    ///
    /// Returns [`StackwireError::NotFound`] if either id was never added.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<()> {
        let from = self.node(dependency)?;
        let to = self.node(dependent)?;
        if self.graph.find_edge(from, to).is_none() {
            let _ = self.graph.add_edge(from, to, ());
        }
        Ok(())
    }

    fn node(&self, id: &str) -> Result<NodeIndex> {
        self.nodes
            .get(id)
            .copied()
            .ok_or_else(|| StackwireError::NotFound {
                kind: "resource",
                id: id.to_string(),
            })
    }

    /// Returns a topological ordering of resources for creation.
    ///
    /// Dependencies appear before the resources that reference them.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(StackwireError::config(format!(
                "cyclic dependency detected at resource \"{}\"",
                self.graph
                    .node_weight(cycle.node_id())
                    .map_or("?", String::as_str)
            ))),
        }
    }

    /// Returns the number of resources in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns whether the graph has no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).expect(name)
    }

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = DependencyGraph::new();
        assert!(graph.is_empty());
        assert!(graph.resolve_order().expect("should resolve").is_empty());
    }

    #[test]
    fn adding_same_resource_twice_is_idempotent() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_resource("vpc");
        let b = graph.add_resource("vpc");
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn network_before_subnet_before_cache() {
        let mut graph = DependencyGraph::new();
        let _ = graph.add_resource("cache");
        let _ = graph.add_resource("subnet");
        let _ = graph.add_resource("vpc");
        graph.add_dependency("subnet", "vpc").expect("edge");
        graph.add_dependency("cache", "subnet").expect("edge");

        let order = graph.resolve_order().expect("should resolve");
        assert!(position(&order, "vpc") < position(&order, "subnet"));
        assert!(position(&order, "subnet") < position(&order, "cache"));
    }

    #[test]
    fn diamond_dependency() {
        let mut graph = DependencyGraph::new();
        for id in ["service", "cluster", "task", "vpc"] {
            let _ = graph.add_resource(id);
        }
        graph.add_dependency("service", "cluster").expect("edge");
        graph.add_dependency("service", "task").expect("edge");
        graph.add_dependency("cluster", "vpc").expect("edge");
        graph.add_dependency("task", "vpc").expect("edge");

        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(order.len(), 4);
        assert!(position(&order, "vpc") < position(&order, "cluster"));
        assert!(position(&order, "vpc") < position(&order, "task"));
        assert!(position(&order, "task") < position(&order, "service"));
    }

    #[test]
    fn unknown_dependency_is_not_found() {
        let mut graph = DependencyGraph::new();
        let _ = graph.add_resource("service");
        let err = graph.add_dependency("service", "ghost").unwrap_err();
        assert!(err.to_string().contains("ghost"), "got: {err}");
    }

    #[test]
    fn cycle_detection() {
        let mut graph = DependencyGraph::new();
        let _ = graph.add_resource("a");
        let _ = graph.add_resource("b");
        graph.add_dependency("a", "b").expect("edge");
        graph.add_dependency("b", "a").expect("edge");

        let msg = graph.resolve_order().unwrap_err().to_string();
        assert!(msg.contains("cyclic"), "got: {msg}");
    }
}
