//! Core types for refmap.
//!
//! Everything downstream of extraction is built from [`Tag`]s. Strings are
//! shared as `Arc<str>` so a file's path is allocated once and cloned cheaply
//! into every tag it owns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Serde helpers for `Arc<str>` fields.
mod arc_str_serde {
    use super::*;

    pub fn serialize<S>(arc: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(arc.as_ref())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.into())
    }
}

/// A file as seen by the cache and graph builder.
///
/// `rel_fname` is the stable identity (graph node, cache key, map header);
/// `fname` is where the bytes actually live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceFile {
    pub rel_fname: Arc<str>,
    pub fname: Arc<str>,
}

impl SourceFile {
    pub fn new(rel_fname: impl Into<Arc<str>>, fname: impl Into<Arc<str>>) -> Self {
        Self {
            rel_fname: rel_fname.into(),
            fname: fname.into(),
        }
    }

    /// Identity for `path` relative to `root`. Paths outside `root` keep
    /// their full form as identity.
    pub fn from_path(root: &Path, path: &Path) -> Self {
        let rel = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        Self::new(rel, path.to_string_lossy().as_ref())
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&*self.fname)
    }

    /// Lowercased extension of the file, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&*self.fname)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// A single occurrence of a symbol name in a file.
///
/// Immutable once built: the fields are public for reading but no API
/// rewrites a tag, and `kind` in particular is decided by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Relative path, the owning file's identity (e.g. "src/lib.rs")
    #[serde(with = "arc_str_serde")]
    pub rel_fname: Arc<str>,
    /// Absolute path for I/O
    #[serde(with = "arc_str_serde")]
    pub fname: Arc<str>,
    /// Zero-based line, `None` when the extractor can't tell (lexer fallback)
    pub line: Option<u32>,
    /// Symbol name
    #[serde(with = "arc_str_serde")]
    pub name: Arc<str>,
    pub kind: TagKind,
}

/// Tag kind - definition or reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    /// Declaration of a function, method, class, struct, ...
    Def,
    /// Any other occurrence of an identifier
    Ref,
}

impl TagKind {
    pub fn is_definition(&self) -> bool {
        matches!(self, TagKind::Def)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, TagKind::Ref)
    }
}

impl Tag {
    pub fn new(file: &SourceFile, line: Option<u32>, name: &str, kind: TagKind) -> Self {
        Self {
            rel_fname: Arc::clone(&file.rel_fname),
            fname: Arc::clone(&file.fname),
            line,
            name: Arc::from(name),
            kind,
        }
    }

    pub fn is_def(&self) -> bool {
        self.kind.is_definition()
    }

    pub fn is_ref(&self) -> bool {
        self.kind.is_reference()
    }
}

/// A file with its importance score, as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFile {
    #[serde(with = "arc_str_serde")]
    pub rel_fname: Arc<str>,
    #[serde(with = "arc_str_serde")]
    pub fname: Arc<str>,
    pub rank: f64,
}

impl RankedFile {
    pub fn new(file: &SourceFile, rank: f64) -> Self {
        Self {
            rel_fname: Arc::clone(&file.rel_fname),
            fname: Arc::clone(&file.fname),
            rank,
        }
    }
}

/// PageRank tunables.
///
/// `tolerance` is compared against the L1 change of the whole rank vector and
/// scaled by node count, matching the usual power-iteration stopping rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Teleport weight given to focus files (others get 1.0)
    pub focus_multiplier: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-6,
            max_iterations: 100,
            focus_multiplier: 100.0,
        }
    }
}

/// Map rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Leading lines of each file shown in the map
    pub preview_lines: usize,
    /// Approximate token budget for the whole map; `None` renders everything
    pub max_tokens: Option<usize>,
    pub color: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preview_lines: 20,
            max_tokens: None,
            color: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_from_path() {
        let file = SourceFile::from_path(Path::new("/repo"), Path::new("/repo/src/lib.rs"));
        assert_eq!(file.rel_fname.as_ref(), "src/lib.rs");
        assert_eq!(file.fname.as_ref(), "/repo/src/lib.rs");
        assert_eq!(file.extension().as_deref(), Some("rs"));
    }

    #[test]
    fn test_source_file_outside_root_keeps_full_path() {
        let file = SourceFile::from_path(Path::new("/repo"), Path::new("/elsewhere/a.py"));
        assert_eq!(file.rel_fname.as_ref(), "/elsewhere/a.py");
    }

    #[test]
    fn test_tag_shares_file_paths() {
        let file = SourceFile::new("a.py", "/repo/a.py");
        let tag = Tag::new(&file, Some(3), "foo", TagKind::Def);
        assert!(Arc::ptr_eq(&tag.rel_fname, &file.rel_fname));
        assert!(tag.is_def());
        assert!(!tag.is_ref());
    }

    #[test]
    fn test_tag_serde_roundtrip() {
        let file = SourceFile::new("a.py", "/repo/a.py");
        let tag = Tag::new(&file, None, "bar", TagKind::Ref);
        let json = serde_json::to_string(&tag).unwrap();
        let back: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(tag, back);
    }
}
