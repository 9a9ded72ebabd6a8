//! File relationship graph.
//!
//! Nodes are file identities; an edge `A -> B` tagged with symbol `S` means
//! "A references S and B defines S". Multiple edges between one ordered pair
//! are kept, one per shared symbol, each weighted by `sqrt(ref count)`.
//!
//! The builder ([`GraphBuilder`]) guarantees:
//! - every input file is a node, even with no tags or a failed read
//! - no self-loops
//! - node and edge insertion order depends only on the input set

mod builder;

pub use builder::{BuildStats, GraphBuilder};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

/// Edge payload: the shared symbol and its weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub symbol: Arc<str>,
    pub weight: f64,
}

#[derive(Debug, Default, Clone)]
pub struct RelationshipGraph {
    graph: DiGraph<Arc<str>, Edge>,
    index: HashMap<Arc<str>, NodeIndex>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node for `file` if it isn't there yet.
    pub fn add_node(&mut self, file: &Arc<str>) -> NodeIndex {
        if let Some(&idx) = self.index.get(file) {
            return idx;
        }
        let idx = self.graph.add_node(Arc::clone(file));
        self.index.insert(Arc::clone(file), idx);
        idx
    }

    /// Add `from -> to` for `symbol`. Self-loops are refused.
    pub fn add_edge(&mut self, from: &Arc<str>, to: &Arc<str>, symbol: &Arc<str>, weight: f64) -> bool {
        if from == to {
            return false;
        }
        let a = self.add_node(from);
        let b = self.add_node(to);
        self.graph.add_edge(
            a,
            b,
            Edge {
                symbol: Arc::clone(symbol),
                weight,
            },
        );
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, file: &str) -> bool {
        self.index.contains_key(file)
    }

    pub fn node_index(&self, file: &str) -> Option<NodeIndex> {
        self.index.get(file).copied()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        self.graph.node_indices().map(move |i| &self.graph[i])
    }

    /// Edges in insertion order as (referencer, definer, payload).
    pub fn edges(&self) -> impl Iterator<Item = (&Arc<str>, &Arc<str>, &Edge)> + '_ {
        self.graph
            .edge_references()
            .map(move |e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
    }

    /// All parallel edges `from -> to`, sorted by symbol.
    pub fn edges_between(&self, from: &str, to: &str) -> Vec<&Edge> {
        let (Some(a), Some(b)) = (self.node_index(from), self.node_index(to)) else {
            return Vec::new();
        };
        let mut edges: Vec<&Edge> = self.graph.edges_connecting(a, b).map(|e| e.weight()).collect();
        edges.sort_by(|x, y| x.symbol.cmp(&y.symbol));
        edges
    }

    pub fn has_self_loops(&self) -> bool {
        self.graph
            .edge_references()
            .any(|e| e.source() == e.target())
    }

    /// Summed weight per ordered pair of files.
    pub fn aggregated_weights(&self) -> BTreeMap<(Arc<str>, Arc<str>), f64> {
        let mut weights = BTreeMap::new();
        for (from, to, edge) in self.edges() {
            *weights
                .entry((Arc::clone(from), Arc::clone(to)))
                .or_insert(0.0) += edge.weight;
        }
        weights
    }

    pub fn inner(&self) -> &DiGraph<Arc<str>, Edge> {
        &self.graph
    }
}
