//! Graph construction from cached tags.
//!
//! Two phases:
//! 1. Collect: fetch every file's tags on the rayon pool through the
//!    [`TagCache`]. No shared state besides the cache.
//! 2. Reduce: fold the collected lists into the definer set and referencer
//!    multiset, then emit edges.
//!
//! Both aggregates are `BTreeMap`s and the inputs are sorted first, so the
//! resulting graph is the same for any completion order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rayon::prelude::*;

use super::RelationshipGraph;
use crate::cache::TagCache;
use crate::types::{SourceFile, Tag, TagKind};

/// Counters from one build, for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub files: usize,
    pub files_with_tags: usize,
    pub definitions: usize,
    pub references: usize,
    pub edges: usize,
}

pub struct GraphBuilder<'a> {
    cache: &'a TagCache,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(cache: &'a TagCache) -> Self {
        Self { cache }
    }

    pub fn build(&self, files: &[SourceFile]) -> RelationshipGraph {
        let (graph, stats) = self.build_with_stats(files);
        tracing::debug!(
            "graph: {} files ({} with tags), {} defs, {} refs, {} edges",
            stats.files,
            stats.files_with_tags,
            stats.definitions,
            stats.references,
            stats.edges
        );
        graph
    }

    pub fn build_with_stats(&self, files: &[SourceFile]) -> (RelationshipGraph, BuildStats) {
        let mut files: Vec<&SourceFile> = files.iter().collect();
        files.sort_by(|a, b| a.rel_fname.cmp(&b.rel_fname));
        files.dedup_by(|a, b| a.rel_fname == b.rel_fname);

        let collected: Vec<(Arc<str>, Arc<[Tag]>)> = files
            .par_iter()
            .map(|file| (Arc::clone(&file.rel_fname), self.cache.get_tags(file)))
            .collect();

        reduce(&collected)
    }
}

/// Build the graph from already-extracted tags, one entry per file.
///
/// Tags are attributed to the file they are listed under.
pub fn reduce(file_tags: &[(Arc<str>, Arc<[Tag]>)]) -> (RelationshipGraph, BuildStats) {
    let mut defines: BTreeMap<Arc<str>, BTreeSet<Arc<str>>> = BTreeMap::new();
    let mut references: BTreeMap<Arc<str>, BTreeMap<Arc<str>, usize>> = BTreeMap::new();
    let mut stats = BuildStats::default();

    let mut nodes: Vec<&Arc<str>> = file_tags.iter().map(|(file, _)| file).collect();
    nodes.sort();
    nodes.dedup();
    stats.files = nodes.len();

    for (file, tags) in file_tags {
        if !tags.is_empty() {
            stats.files_with_tags += 1;
        }
        for tag in tags.iter() {
            match tag.kind {
                TagKind::Def => {
                    stats.definitions += 1;
                    defines
                        .entry(Arc::clone(&tag.name))
                        .or_default()
                        .insert(Arc::clone(file));
                }
                TagKind::Ref => {
                    stats.references += 1;
                    *references
                        .entry(Arc::clone(&tag.name))
                        .or_default()
                        .entry(Arc::clone(file))
                        .or_insert(0) += 1;
                }
            }
        }
    }

    let mut graph = RelationshipGraph::new();
    for file in nodes {
        graph.add_node(file);
    }

    // Names missing from either side contribute nothing
    for (symbol, referencers) in &references {
        let Some(definers) = defines.get(symbol) else {
            continue;
        };
        for (referencer, &count) in referencers {
            let weight = (count as f64).sqrt();
            for definer in definers {
                if graph.add_edge(referencer, definer, symbol, weight) {
                    stats.edges += 1;
                }
            }
        }
    }

    (graph, stats)
}
