//! refmap - ranked repository maps
//!
//! Builds a compact, ranked overview of a source tree: which files matter
//! most, judged by how often other files reference the symbols they define.
//!
//! # Architecture
//!
//! ```text
//! File Discovery → Tag Extraction → Graph Building → PageRank → Rendering
//!       ↓              ↓                 ↓              ↓           ↓
//!    ignore        tree-sitter       petgraph       weighted     preview
//!    crate        + .scm / lexer     DiGraph         power        blocks
//! ```
//!
//! - Extraction runs on the rayon pool, memoized per file by [`TagCache`]
//!   (optionally persisted in redb).
//! - Edges point from referencing file to defining file, weighted by
//!   `sqrt(reference count)`, never self-loops.
//! - Ranks sum to 1; an edgeless graph ranks uniformly.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extraction;
pub mod graph;
pub mod ranking;
pub mod rendering;
pub mod repomap;
pub mod types;

pub use cache::TagCache;
pub use config::Config;
pub use error::ExtractError;
pub use extraction::{ExtractionBackend, TagExtractor};
pub use graph::{Edge, GraphBuilder, RelationshipGraph};
pub use ranking::PageRanker;
pub use rendering::MapRenderer;
pub use repomap::RepoMap;
pub use types::{RankedFile, RankingConfig, RenderConfig, SourceFile, Tag, TagKind};
