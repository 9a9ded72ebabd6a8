//! End-to-end map generation.
//!
//! [`RepoMap`] owns one [`TagCache`] for its lifetime, so repeated maps over
//! the same repository only re-parse files that were evicted (or changed,
//! with the disk tier enabled). Graph and ranks are rebuilt on every call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::cache::{DiskStore, TagCache};
use crate::extraction::TagExtractor;
use crate::graph::{GraphBuilder, RelationshipGraph};
use crate::ranking::PageRanker;
use crate::rendering::MapRenderer;
use crate::types::{RankedFile, RankingConfig, RenderConfig, SourceFile};

pub struct RepoMap {
    root: PathBuf,
    cache: TagCache,
    ranker: PageRanker,
    renderer: MapRenderer,
    focus: Vec<String>,
}

impl RepoMap {
    pub fn new(root: impl Into<PathBuf>, ranking: RankingConfig, render: RenderConfig) -> Self {
        Self {
            root: root.into(),
            cache: TagCache::new(TagExtractor::new()),
            ranker: PageRanker::new(ranking),
            renderer: MapRenderer::new(render),
            focus: Vec::new(),
        }
    }

    /// Persist tags under `<root>/.refmap.cache`.
    pub fn with_disk_cache(mut self) -> Result<Self> {
        let store = DiskStore::open(&self.root)?;
        self.cache = self.cache.with_disk(store);
        Ok(self)
    }

    /// Bias ranking toward these files (relative paths).
    pub fn with_focus(mut self, focus: Vec<String>) -> Self {
        self.focus = focus;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> &TagCache {
        &self.cache
    }

    /// Identities for absolute (or root-relative) paths.
    pub fn source_files(&self, paths: &[PathBuf]) -> Vec<SourceFile> {
        paths
            .iter()
            .map(|p| {
                let abs = if p.is_absolute() { p.clone() } else { self.root.join(p) };
                SourceFile::from_path(&self.root, &abs)
            })
            .collect()
    }

    pub fn build_graph(&self, files: &[SourceFile]) -> RelationshipGraph {
        GraphBuilder::new(&self.cache).build(files)
    }

    pub fn rank_graph(&self, graph: &RelationshipGraph) -> HashMap<Arc<str>, f64> {
        if self.focus.is_empty() {
            self.ranker.rank(graph)
        } else {
            let weights = self.ranker.focus_weights(graph, &self.focus);
            self.ranker.rank_personalized(graph, &weights)
        }
    }

    /// Rank `paths`, highest score first (ties by name).
    pub fn rank_files(&self, paths: &[PathBuf]) -> Vec<RankedFile> {
        let files = self.source_files(paths);

        tracing::info!("Building graph...");
        let graph = self.build_graph(&files);

        tracing::info!("Ranking files...");
        let ranks = self.rank_graph(&graph);

        let mut ranked: Vec<RankedFile> = dedup(files)
            .iter()
            .map(|f| RankedFile::new(f, ranks.get(&f.rel_fname).copied().unwrap_or(0.0)))
            .collect();
        ranked.sort_by(|a, b| {
            b.rank
                .total_cmp(&a.rank)
                .then_with(|| a.rel_fname.cmp(&b.rel_fname))
        });
        ranked
    }

    /// The rendered map for `paths`. An empty set gives an empty string.
    pub fn get_repo_map(&self, paths: &[PathBuf]) -> String {
        let ranked = self.rank_files(paths);
        tracing::info!("Generating map...");
        self.renderer.render(&ranked)
    }
}

fn dedup(mut files: Vec<SourceFile>) -> Vec<SourceFile> {
    files.sort_by(|a, b| a.rel_fname.cmp(&b.rel_fname));
    files.dedup_by(|a, b| a.rel_fname == b.rel_fname);
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "def foo():\n    return 1\n").unwrap();
        fs::write(dir.path().join("b.py"), "print(foo())\nprint(foo())\n").unwrap();
        fs::write(dir.path().join("c.py"), "x = 1\n").unwrap();
        dir
    }

    fn paths(dir: &Path) -> Vec<PathBuf> {
        ["a.py", "b.py", "c.py"].iter().map(|f| dir.join(f)).collect()
    }

    #[test]
    fn test_rank_files_orders_definer_first() {
        let dir = repo();
        let map = RepoMap::new(dir.path(), RankingConfig::default(), RenderConfig::default());
        let ranked = map.rank_files(&paths(dir.path()));

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].rel_fname.as_ref(), "a.py");
        let total: f64 = ranked.iter().map(|r| r.rank).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_relative_paths_resolve_against_root() {
        let dir = repo();
        let map = RepoMap::new(dir.path(), RankingConfig::default(), RenderConfig::default());
        let files = map.source_files(&[PathBuf::from("a.py"), dir.path().join("b.py")]);
        assert_eq!(files[0].rel_fname.as_ref(), "a.py");
        assert!(files[0].path().is_absolute());
        assert_eq!(files[1].rel_fname.as_ref(), "b.py");
        assert_eq!(files[1].path(), dir.path().join("b.py"));
    }

    #[test]
    fn test_get_repo_map_text() {
        let dir = repo();
        let map = RepoMap::new(dir.path(), RankingConfig::default(), RenderConfig::default());
        let text = map.get_repo_map(&paths(dir.path()));
        assert!(text.starts_with("a.py (rank: "));
        assert!(text.contains("def foo():"));
        assert_eq!(text, map.get_repo_map(&paths(dir.path())));
        assert_eq!(map.get_repo_map(&[]), "");
    }

    #[test]
    fn test_focus_lifts_file() {
        let dir = repo();
        let map = RepoMap::new(dir.path(), RankingConfig::default(), RenderConfig::default())
            .with_focus(vec!["c.py".to_string()]);
        let ranked = map.rank_files(&paths(dir.path()));
        assert_eq!(ranked[0].rel_fname.as_ref(), "c.py");
    }

    #[test]
    fn test_disk_cache_dir_created() -> Result<()> {
        let dir = repo();
        let map = RepoMap::new(dir.path(), RankingConfig::default(), RenderConfig::default())
            .with_disk_cache()?;
        map.rank_files(&paths(dir.path()));
        assert!(dir.path().join(crate::cache::CACHE_DIR).join("tags.redb").exists());
        assert!(map.cache().disk().is_some());
        Ok(())
    }
}
