//! In-memory tag memoization with at-most-one extraction per file.
//!
//! Every file identity maps to a `OnceCell`. The first caller runs the
//! extraction inside `get_or_init`; concurrent callers for the same file
//! block on that cell and receive the same `Arc<[Tag]>`. The map's shard
//! lock is only held while fetching the cell, never during extraction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use super::store::{DiskStore, Fingerprint, StoreStats};
use crate::error::ExtractError;
use crate::extraction::TagExtractor;
use crate::types::{SourceFile, Tag};

type Slot = Arc<OnceCell<Arc<[Tag]>>>;

/// Snapshot of both tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub failures: usize,
    pub extractions: usize,
    pub disk: Option<StoreStats>,
}

pub struct TagCache {
    extractor: TagExtractor,
    entries: DashMap<Arc<str>, Slot>,
    failures: DashMap<Arc<str>, String>,
    disk: Option<DiskStore>,
    extractions: AtomicUsize,
}

impl TagCache {
    pub fn new(extractor: TagExtractor) -> Self {
        Self {
            extractor,
            entries: DashMap::new(),
            failures: DashMap::new(),
            disk: None,
            extractions: AtomicUsize::new(0),
        }
    }

    /// Back the memory cache with a persistent store.
    pub fn with_disk(mut self, disk: DiskStore) -> Self {
        self.disk = Some(disk);
        self
    }

    pub fn disk(&self) -> Option<&DiskStore> {
        self.disk.as_ref()
    }

    /// Tags for `file`, extracting on first request only.
    ///
    /// Unreadable or unparsable files yield an empty list; the cause is
    /// logged and kept in [`TagCache::failures`].
    pub fn get_tags(&self, file: &SourceFile) -> Arc<[Tag]> {
        let slot: Slot = Arc::clone(
            self.entries
                .entry(Arc::clone(&file.rel_fname))
                .or_default()
                .value(),
        );
        Arc::clone(slot.get_or_init(|| self.load(file)))
    }

    fn load(&self, file: &SourceFile) -> Arc<[Tag]> {
        let fingerprint = self
            .disk
            .as_ref()
            .and_then(|_| Fingerprint::of_path(&file.path()));

        if let (Some(disk), Some(fingerprint)) = (&self.disk, fingerprint) {
            if let Some(tags) = disk.get(&file.rel_fname, fingerprint) {
                tracing::debug!("{}: {} tags from disk cache", file.rel_fname, tags.len());
                return tags.into();
            }
        }

        self.extractions.fetch_add(1, Ordering::Relaxed);

        match self.extractor.extract_file(file) {
            Ok(tags) => {
                if let (Some(disk), Some(fingerprint)) = (&self.disk, fingerprint) {
                    if let Err(e) = disk.set(&file.rel_fname, fingerprint, &tags) {
                        tracing::warn!("{}: could not persist tags: {:#}", file.rel_fname, e);
                    }
                }
                tags.into()
            }
            Err(e) => {
                self.record_failure(file, &e);
                Arc::from(Vec::new())
            }
        }
    }

    fn record_failure(&self, file: &SourceFile, error: &ExtractError) {
        match error {
            ExtractError::LanguageUnsupported { .. } => tracing::debug!("skipping: {}", error),
            _ => tracing::warn!("{}", error),
        }
        self.failures
            .insert(Arc::clone(&file.rel_fname), error.to_string());
    }

    /// Forget `rel_fname` so the next request re-extracts it.
    pub fn evict(&self, rel_fname: &str) {
        self.entries.remove(rel_fname);
        self.failures.remove(rel_fname);
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.remove(rel_fname) {
                tracing::warn!("{}: could not evict from disk cache: {:#}", rel_fname, e);
            }
        }
    }

    /// Forget everything, including the persistent store.
    pub fn clear(&self) {
        self.entries.clear();
        self.failures.clear();
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.clear() {
                tracing::warn!("could not clear disk cache: {:#}", e);
            }
        }
    }

    /// Recorded per-file failures as (file, cause), sorted by file.
    pub fn failures(&self) -> Vec<(String, String)> {
        let mut failures: Vec<(String, String)> = self
            .failures
            .iter()
            .map(|e| (e.key().to_string(), e.value().clone()))
            .collect();
        failures.sort();
        failures
    }

    /// Files currently memoized.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            failures: self.failures.len(),
            extractions: self.extraction_count(),
            disk: self.disk.as_ref().map(DiskStore::stats),
        }
    }

    /// How many times the extractor actually ran (disk hits excluded).
    pub fn extraction_count(&self) -> usize {
        self.extractions.load(Ordering::Relaxed)
    }
}

impl Default for TagCache {
    fn default() -> Self {
        Self::new(TagExtractor::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::fs;

    fn write(dir: &std::path::Path, name: &str, content: &str) -> SourceFile {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        SourceFile::from_path(dir, &path)
    }

    #[test]
    fn test_second_call_reuses_result() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "a.py", "def foo():\n    pass\n");
        let cache = TagCache::default();

        let first = cache.get_tags(&file);
        // Changing the file does not matter until the entry is evicted
        fs::write(file.path(), "def bar():\n    pass\n").unwrap();
        let second = cache.get_tags(&file);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.extraction_count(), 1);

        cache.evict(&file.rel_fname);
        let third = cache.get_tags(&file);
        assert!(third.iter().any(|t| t.name.as_ref() == "bar"));
        assert_eq!(cache.extraction_count(), 2);
    }

    #[test]
    fn test_concurrent_requests_extract_once() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "a.py", "def foo():\n    return bar()\n");
        let cache = TagCache::default();

        let results: Vec<Arc<[Tag]>> = (0..32)
            .into_par_iter()
            .map(|_| cache.get_tags(&file))
            .collect();

        assert_eq!(cache.extraction_count(), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[test]
    fn test_missing_file_is_recorded_not_raised() {
        let cache = TagCache::default();
        let file = SourceFile::new("gone.py", "/nonexistent/gone.py");

        assert!(cache.get_tags(&file).is_empty());
        let failures = cache.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "gone.py");
        assert!(failures[0].1.contains("failed to read"));
    }

    #[test]
    fn test_disk_tier_survives_new_cache() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "a.py", "def foo():\n    pass\n");

        let cold = TagCache::default().with_disk(DiskStore::open(dir.path()).unwrap());
        let tags = cold.get_tags(&file);
        assert_eq!(cold.extraction_count(), 1);
        drop(cold);

        let warm = TagCache::default().with_disk(DiskStore::open(dir.path()).unwrap());
        assert_eq!(warm.get_tags(&file).as_ref(), tags.as_ref());
        assert_eq!(warm.extraction_count(), 0);

        let stats = warm.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.failures, 0);
        let disk = stats.disk.unwrap();
        assert_eq!(disk.files, 1);
        assert_eq!(disk.tags, tags.len());
    }

    #[test]
    fn test_disk_entry_for_edited_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "a.py", "def foo():\n    pass\n");

        let cold = TagCache::default().with_disk(DiskStore::open(dir.path()).unwrap());
        cold.get_tags(&file);
        drop(cold);

        fs::write(file.path(), "def foobar():\n    pass\n").unwrap();
        let warm = TagCache::default().with_disk(DiskStore::open(dir.path()).unwrap());
        let tags = warm.get_tags(&file);
        assert_eq!(warm.extraction_count(), 1);
        assert!(tags.iter().any(|t| t.name.as_ref() == "foobar"));
    }

    #[test]
    fn test_non_utf8_file_is_recorded_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.py");
        fs::write(&path, b"def caf\xe9():\n    pass\n").unwrap();
        let file = SourceFile::from_path(dir.path(), &path);

        let cache = TagCache::default();
        assert!(cache.get_tags(&file).is_empty());
        let failures = cache.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "latin1.py");
        assert!(failures[0].1.contains("failed to read"));
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_denied_is_recorded_failure() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "locked.py", "def foo():\n    pass\n");
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(file.path()).is_ok() {
            // Running as root: permission bits are not enforced
            return;
        }

        let cache = TagCache::default();
        assert!(cache.get_tags(&file).is_empty());
        assert_eq!(cache.failures().len(), 1);
        assert!(cache.failures()[0].1.contains("failed to read"));
    }

    #[test]
    fn test_clear_empties_memory() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "a.py", "x = 1\n");
        let cache = TagCache::default();
        cache.get_tags(&file);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
