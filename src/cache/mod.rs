//! Tag caching.
//!
//! Two tiers:
//! - [`TagCache`]: in-memory memoization, one extraction per file identity
//! - [`DiskStore`]: optional redb store validated by file mtime and length, so warm
//!   runs skip parsing unchanged files

mod store;
mod tags;

pub use store::{DiskStore, Fingerprint, StoreStats, CACHE_DIR};
pub use tags::{CacheStats, TagCache};
