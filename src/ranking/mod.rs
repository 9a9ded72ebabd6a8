//! Ranking: relationship graph to per-file importance scores.

mod pagerank;

pub use pagerank::PageRanker;
