//! Persistent tag store backed by redb.
//!
//! One table, `tags`, in `<root>/.refmap.cache/tags.redb`, keyed by the
//! file's relative path. Each value is a bincode entry: the
//! [`Fingerprint`] the file had when it was extracted, plus its tags.
//!
//! A lookup only hits when the caller's current fingerprint equals the stored
//! one. Length is part of the fingerprint because coarse filesystem clocks
//! can leave the mtime unchanged across a quick edit.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::types::Tag;

/// Directory created under the repository root.
pub const CACHE_DIR: &str = ".refmap.cache";

const DB_FILE: &str = "tags.redb";

const TAGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tags");

/// What a file looked like when its tags were extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub mtime_secs: u64,
    pub mtime_nanos: u32,
    pub len: u64,
}

impl Fingerprint {
    /// `None` when the platform has no mtime or it predates the epoch.
    pub fn from_metadata(meta: &Metadata) -> Option<Self> {
        let since_epoch = meta
            .modified()
            .ok()?
            .duration_since(SystemTime::UNIX_EPOCH)
            .ok()?;
        Some(Self {
            mtime_secs: since_epoch.as_secs(),
            mtime_nanos: since_epoch.subsec_nanos(),
            len: meta.len(),
        })
    }

    pub fn of_path(path: &Path) -> Option<Self> {
        fs::metadata(path).ok().as_ref().and_then(Self::from_metadata)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    fingerprint: Fingerprint,
    tags: Vec<Tag>,
}

fn decode(bytes: &[u8]) -> Option<StoredEntry> {
    match bincode::deserialize(bytes) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::debug!("unreadable cache entry: {}", e);
            None
        }
    }
}

/// Tags on disk, validated against each file's [`Fingerprint`].
pub struct DiskStore {
    db: Database,
    path: PathBuf,
}

impl DiskStore {
    /// Open `<root>/.refmap.cache/tags.redb`, creating it if needed.
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join(CACHE_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create {}", dir.display()))?;

        let path = dir.join(DB_FILE);
        let db = Database::create(&path)
            .with_context(|| format!("Cannot open tag store {}", path.display()))?;
        tracing::debug!("tag store at {}", path.display());

        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored tags for `rel_fname` when they were extracted from a file with
    /// exactly this `fingerprint`. Missing tables and corrupt values are
    /// misses.
    pub fn get(&self, rel_fname: &str, fingerprint: Fingerprint) -> Option<Vec<Tag>> {
        let txn = self.db.begin_read().ok()?;
        let table = txn.open_table(TAGS_TABLE).ok()?;
        let guard = table.get(rel_fname).ok()??;
        let entry = decode(guard.value())?;

        if entry.fingerprint != fingerprint {
            tracing::debug!("{}: stale cache entry", rel_fname);
            return None;
        }
        Some(entry.tags)
    }

    pub fn set(&self, rel_fname: &str, fingerprint: Fingerprint, tags: &[Tag]) -> Result<()> {
        let entry = StoredEntry {
            fingerprint,
            tags: tags.to_vec(),
        };
        let bytes = bincode::serialize(&entry)
            .with_context(|| format!("Cannot encode tags for {}", rel_fname))?;

        self.write(|txn| {
            let mut table = txn.open_table(TAGS_TABLE)?;
            table.insert(rel_fname, bytes.as_slice())?;
            Ok(())
        })
        .with_context(|| format!("Cannot store tags for {}", rel_fname))
    }

    pub fn remove(&self, rel_fname: &str) -> Result<()> {
        self.write(|txn| {
            let mut table = txn.open_table(TAGS_TABLE)?;
            table.remove(rel_fname)?;
            Ok(())
        })
        .with_context(|| format!("Cannot drop tags for {}", rel_fname))
    }

    /// Drop the whole table. The next `set` recreates it.
    pub fn clear(&self) -> Result<()> {
        self.write(|txn| {
            txn.delete_table(TAGS_TABLE)?;
            Ok(())
        })
        .context("Cannot clear tag store")
    }

    /// Run `f` in one write transaction and commit it.
    fn write<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&redb::WriteTransaction) -> Result<(), redb::Error>,
    {
        let txn = self.db.begin_write()?;
        f(&txn)?;
        txn.commit()?;
        Ok(())
    }

    /// Files stored and the tags stored for them.
    pub fn stats(&self) -> StoreStats {
        let Ok(txn) = self.db.begin_read() else {
            return StoreStats::default();
        };
        let Ok(table) = txn.open_table(TAGS_TABLE) else {
            return StoreStats::default();
        };
        let Ok(rows) = table.iter() else {
            return StoreStats::default();
        };

        let mut stats = StoreStats {
            files: table.len().map_or(0, |n| n as usize),
            tags: 0,
            defs: 0,
        };
        for (_, value) in rows.flatten() {
            if let Some(entry) = decode(value.value()) {
                stats.tags += entry.tags.len();
                stats.defs += entry.tags.iter().filter(|t| t.is_def()).count();
            }
        }
        stats
    }
}

/// Contents of a [`DiskStore`], counted the way the map counts them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub files: usize,
    pub tags: usize,
    pub defs: usize,
}
