//! Weighted PageRank over the relationship graph.
//!
//! ```text
//! PR(v) = (1-α)·p[v] + α·Σ PR(u)·w(u,v)/W(u) + α·D·p[v]
//! ```
//!
//! - `w(u,v)`: summed weight of all parallel edges u -> v
//! - `W(u)`: total out-weight of u
//! - `D`: rank mass sitting on dangling nodes (W = 0)
//! - `p`: teleport distribution, uniform unless personalized
//!
//! With no edges every node is dangling and the fixed point is `p` itself,
//! so an edgeless graph ranks uniformly instead of failing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use petgraph::visit::EdgeRef;

use crate::graph::RelationshipGraph;
use crate::types::RankingConfig;

/// Incoming transitions of one node: (source index, w(u,v)/W(u)).
type Incoming = Vec<Vec<(usize, f64)>>;

pub struct PageRanker {
    config: RankingConfig,
}

impl PageRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Scores per file, non-negative and summing to 1.
    pub fn rank(&self, graph: &RelationshipGraph) -> HashMap<Arc<str>, f64> {
        let n = graph.node_count();
        self.run(graph, vec![1.0 / n as f64; n])
    }

    /// Like [`PageRanker::rank`], teleporting in proportion to `weights`.
    ///
    /// Files missing from `weights` get 0, names not in the graph are
    /// ignored. If nothing positive remains, this is plain [`PageRanker::rank`].
    pub fn rank_personalized(
        &self,
        graph: &RelationshipGraph,
        weights: &HashMap<Arc<str>, f64>,
    ) -> HashMap<Arc<str>, f64> {
        let n = graph.node_count();
        let mut teleport: Vec<f64> = graph
            .nodes()
            .map(|file| {
                weights
                    .get(file)
                    .copied()
                    .filter(|w| w.is_finite() && *w > 0.0)
                    .unwrap_or(0.0)
            })
            .collect();

        let total: f64 = teleport.iter().sum();
        if total <= 0.0 {
            return self.rank(graph);
        }
        for p in &mut teleport {
            *p /= total;
        }
        debug_assert_eq!(teleport.len(), n);

        self.run(graph, teleport)
    }

    /// Teleport weights giving `focus` files `focus_multiplier` and every
    /// other node 1.0.
    pub fn focus_weights<S: AsRef<str>>(
        &self,
        graph: &RelationshipGraph,
        focus: &[S],
    ) -> HashMap<Arc<str>, f64> {
        graph
            .nodes()
            .map(|file| {
                let focused = focus.iter().any(|f| f.as_ref() == file.as_ref());
                let weight = if focused {
                    self.config.focus_multiplier
                } else {
                    1.0
                };
                (Arc::clone(file), weight)
            })
            .collect()
    }

    fn run(&self, graph: &RelationshipGraph, teleport: Vec<f64>) -> HashMap<Arc<str>, f64> {
        let n = graph.node_count();
        if n == 0 {
            return HashMap::new();
        }

        let (incoming, dangling) = transitions(graph);
        let alpha = self.config.damping;
        let threshold = self.config.tolerance * n as f64;

        let mut ranks = vec![1.0 / n as f64; n];
        let mut next = vec![0.0; n];
        let mut converged = false;

        for iteration in 0..self.config.max_iterations {
            let dangling_sum: f64 = dangling.iter().map(|&u| ranks[u]).sum();

            for v in 0..n {
                let followed: f64 = incoming[v].iter().map(|&(u, p)| ranks[u] * p).sum();
                next[v] = (1.0 - alpha) * teleport[v] + alpha * followed + alpha * dangling_sum * teleport[v];
            }

            let delta: f64 = ranks.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
            std::mem::swap(&mut ranks, &mut next);

            if delta < threshold {
                tracing::debug!("pagerank converged after {} iterations", iteration + 1);
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                "pagerank did not converge within {} iterations; using last iterate",
                self.config.max_iterations
            );
        }

        // Float drift only; the iteration preserves total mass
        let total: f64 = ranks.iter().sum();
        if total > 0.0 {
            for r in &mut ranks {
                *r /= total;
            }
        }

        graph
            .inner()
            .node_indices()
            .map(|idx| (Arc::clone(&graph.inner()[idx]), ranks[idx.index()]))
            .collect()
    }
}

impl Default for PageRanker {
    fn default() -> Self {
        Self::new(RankingConfig::default())
    }
}

/// Normalized incoming transitions per node, plus the dangling nodes.
fn transitions(graph: &RelationshipGraph) -> (Incoming, Vec<usize>) {
    let inner = graph.inner();
    let n = inner.node_count();

    let mut pair_weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    let mut out_weight = vec![0.0; n];
    for edge in inner.edge_references() {
        let (u, v) = (edge.source().index(), edge.target().index());
        let w = edge.weight().weight.max(0.0);
        *pair_weights.entry((u, v)).or_insert(0.0) += w;
        out_weight[u] += w;
    }

    let mut incoming: Incoming = vec![Vec::new(); n];
    for ((u, v), w) in pair_weights {
        if out_weight[u] > 0.0 {
            incoming[v].push((u, w / out_weight[u]));
        }
    }

    let dangling = (0..n).filter(|&u| out_weight[u] <= 0.0).collect();
    (incoming, dangling)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Arc<str> {
        Arc::from(v)
    }

    fn total(ranks: &HashMap<Arc<str>, f64>) -> f64 {
        ranks.values().sum()
    }

    #[test]
    fn test_empty_graph() {
        let ranks = PageRanker::default().rank(&RelationshipGraph::new());
        assert!(ranks.is_empty());
    }

    #[test]
    fn test_single_node_gets_everything() {
        let mut g = RelationshipGraph::new();
        g.add_node(&s("only.py"));
        let ranks = PageRanker::default().rank(&g);
        assert!((ranks["only.py"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_edges_is_uniform() {
        let mut g = RelationshipGraph::new();
        for f in ["a", "b", "c", "d"] {
            g.add_node(&s(f));
        }
        let ranks = PageRanker::default().rank(&g);
        assert!((total(&ranks) - 1.0).abs() < 1e-9);
        for r in ranks.values() {
            assert!((r - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn test_referenced_file_outranks_others() {
        let mut g = RelationshipGraph::new();
        g.add_edge(&s("b.py"), &s("a.py"), &s("foo"), 2f64.sqrt());
        g.add_node(&s("c.py"));

        let ranks = PageRanker::default().rank(&g);
        assert!((total(&ranks) - 1.0).abs() < 1e-9);
        assert!(ranks["a.py"] > ranks["b.py"]);
        assert!(ranks["a.py"] > ranks["c.py"]);
        assert!((ranks["b.py"] - ranks["c.py"]).abs() < 1e-9);
    }

    #[test]
    fn test_heavier_edge_gets_more_mass() {
        let mut g = RelationshipGraph::new();
        g.add_edge(&s("src.py"), &s("heavy.py"), &s("x"), 3.0);
        g.add_edge(&s("src.py"), &s("heavy.py"), &s("y"), 1.0);
        g.add_edge(&s("src.py"), &s("light.py"), &s("z"), 1.0);

        let ranks = PageRanker::default().rank(&g);
        assert!(ranks["heavy.py"] > ranks["light.py"]);
        assert!(ranks.values().all(|r| *r >= 0.0));
    }

    #[test]
    fn test_cycle_is_symmetric() {
        let mut g = RelationshipGraph::new();
        g.add_edge(&s("a"), &s("b"), &s("x"), 1.0);
        g.add_edge(&s("b"), &s("a"), &s("y"), 1.0);
        let ranks = PageRanker::default().rank(&g);
        assert!((ranks["a"] - 0.5).abs() < 1e-6);
        assert!((ranks["b"] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_focus_boosts_file() {
        let mut g = RelationshipGraph::new();
        for f in ["a", "b", "c"] {
            g.add_node(&s(f));
        }
        let ranker = PageRanker::default();
        let weights = ranker.focus_weights(&g, &["c"]);
        assert_eq!(weights[&s("c")], 100.0);
        assert_eq!(weights[&s("a")], 1.0);

        let ranks = ranker.rank_personalized(&g, &weights);
        assert!((total(&ranks) - 1.0).abs() < 1e-9);
        assert!(ranks["c"] > ranks["a"]);
    }

    #[test]
    fn test_zero_personalization_falls_back_to_uniform() {
        let mut g = RelationshipGraph::new();
        g.add_node(&s("a"));
        g.add_node(&s("b"));
        let mut weights = HashMap::new();
        weights.insert(s("a"), 0.0);
        weights.insert(s("unknown"), 5.0);

        let ranks = PageRanker::default().rank_personalized(&g, &weights);
        assert!((ranks["a"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_iteration_cap_still_sums_to_one() {
        let mut g = RelationshipGraph::new();
        g.add_edge(&s("a"), &s("b"), &s("x"), 1.0);
        g.add_edge(&s("b"), &s("c"), &s("y"), 1.0);
        let ranker = PageRanker::new(RankingConfig {
            max_iterations: 1,
            tolerance: 0.0,
            ..RankingConfig::default()
        });
        let ranks = ranker.rank(&g);
        assert!((total(&ranks) - 1.0).abs() < 1e-9);
    }
}
