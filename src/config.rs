//! Configuration loading from refmap.toml and pyproject.toml.
//!
//! Follows the ruff/black convention:
//! - standalone `refmap.toml` in the repository root
//! - `[tool.refmap]` section in `pyproject.toml`, searched upward
//!
//! ## Example
//!
//! ```toml
//! [tool.refmap]
//! include = ["src/**", "lib/**"]
//! extend-exclude = ["**/generated/**"]
//! damping = 0.85
//! preview-lines = 20
//! map-tokens = 4096
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::types::{RankingConfig, RenderConfig};

/// Default exclude patterns (common non-source directories).
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/target/**",
    "**/build/**",
    "**/dist/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "**/venv/**",
    "**/.tox/**",
    "**/.mypy_cache/**",
    "**/.pytest_cache/**",
    "**/vendor/**",
    "**/third_party/**",
    "**/.refmap.cache/**",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// File this config came from; `None` for defaults.
    pub source: Option<PathBuf>,

    /// Glob patterns for files to include. Empty includes everything.
    pub include: Vec<String>,

    /// Glob patterns for files to exclude. Replaces the defaults if set.
    pub exclude: Vec<String>,

    /// Extra exclude patterns on top of the defaults.
    pub extend_exclude: Vec<String>,

    pub damping: Option<f64>,
    pub preview_lines: Option<usize>,
    pub map_tokens: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    extend_exclude: Option<Vec<String>>,
    damping: Option<f64>,
    preview_lines: Option<usize>,
    map_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct PyProject {
    tool: Option<PyProjectTool>,
}

#[derive(Debug, Deserialize)]
struct PyProjectTool {
    refmap: Option<RawConfig>,
}

impl Config {
    /// Load configuration for `directory`.
    ///
    /// Search order:
    /// 1. refmap.toml in `directory`
    /// 2. `[tool.refmap]` in pyproject.toml, in `directory` then its parents
    /// 3. defaults
    ///
    /// A broken refmap.toml is an error. A pyproject.toml that doesn't parse
    /// is skipped with a warning, since it usually belongs to other tools.
    pub fn load(directory: &Path) -> Result<Self> {
        let refmap_toml = directory.join("refmap.toml");
        if refmap_toml.is_file() {
            return Self::load_refmap_toml(&refmap_toml);
        }

        let mut current = Some(directory);
        while let Some(dir) = current {
            let pyproject = dir.join("pyproject.toml");
            if pyproject.is_file() {
                match Self::load_pyproject(&pyproject) {
                    Ok(Some(config)) => return Ok(config),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("ignoring {}: {:#}", pyproject.display(), e),
                }
            }
            current = dir.parent();
        }

        Ok(Self::default())
    }

    fn load_refmap_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw: RawConfig =
            toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))?;
        Self::from_raw(raw, path.to_path_buf())
    }

    fn load_pyproject(path: &Path) -> Result<Option<Self>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let pyproject: PyProject = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?;

        match pyproject.tool.and_then(|t| t.refmap) {
            Some(raw) => Self::from_raw(raw, path.to_path_buf()).map(Some),
            None => Ok(None),
        }
    }

    fn from_raw(raw: RawConfig, source: PathBuf) -> Result<Self> {
        if let Some(d) = raw.damping {
            if !(0.0..1.0).contains(&d) {
                bail!("damping must be in [0, 1), got {} ({})", d, source.display());
            }
        }

        Ok(Self {
            source: Some(source),
            include: raw.include.unwrap_or_default(),
            exclude: raw.exclude.unwrap_or_default(),
            extend_exclude: raw.extend_exclude.unwrap_or_default(),
            damping: raw.damping,
            preview_lines: raw.preview_lines,
            map_tokens: raw.map_tokens,
        })
    }

    /// Defaults + extend-exclude, or the custom exclude list.
    pub fn effective_excludes(&self) -> Vec<String> {
        if !self.exclude.is_empty() {
            self.exclude.clone()
        } else {
            let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
            patterns.extend(self.extend_exclude.iter().cloned());
            patterns
        }
    }

    pub fn matches_include(&self, path: &Path) -> bool {
        if self.include.is_empty() {
            return true;
        }
        let path_str = path.to_string_lossy();
        self.include
            .iter()
            .any(|pattern| glob_match::glob_match(pattern, &path_str))
    }

    pub fn matches_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.effective_excludes()
            .iter()
            .any(|pattern| glob_match::glob_match(pattern, &path_str))
    }

    /// Matches include AND not exclude.
    pub fn should_include(&self, path: &Path) -> bool {
        self.matches_include(path) && !self.matches_exclude(path)
    }

    pub fn ranking_config(&self) -> RankingConfig {
        let mut config = RankingConfig::default();
        if let Some(d) = self.damping {
            config.damping = d;
        }
        config
    }

    pub fn render_config(&self) -> RenderConfig {
        let mut config = RenderConfig::default();
        if let Some(n) = self.preview_lines {
            config.preview_lines = n;
        }
        config.max_tokens = self.map_tokens;
        config
    }

    /// Multi-line summary for verbose output.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        match &self.source {
            Some(source) => lines.push(format!("config: {}", source.display())),
            None => lines.push("config: (defaults)".to_string()),
        }

        if !self.include.is_empty() {
            lines.push(format!("include: {}", self.include.join(", ")));
        }

        let excludes = self.effective_excludes();
        if excludes.len() <= 3 {
            lines.push(format!("exclude: {}", excludes.join(", ")));
        } else {
            lines.push(format!(
                "exclude: {}, ... (+{} more)",
                excludes[..2].join(", "),
                excludes.len() - 2
            ));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_excludes() {
        let config = Config::default();
        assert!(config.matches_exclude(Path::new("foo/node_modules/bar.js")));
        assert!(config.matches_exclude(Path::new("project/.git/config")));
        assert!(config.matches_exclude(Path::new("repo/.refmap.cache/tags.redb")));
        assert!(!config.matches_exclude(Path::new("src/main.py")));
        assert!(DEFAULT_EXCLUDES.iter().any(|p| p.contains(crate::cache::CACHE_DIR)));
    }

    #[test]
    fn test_include_patterns() {
        let config = Config {
            include: vec!["src/**".to_string(), "lib/**".to_string()],
            ..Default::default()
        };
        assert!(config.matches_include(Path::new("src/main.py")));
        assert!(config.matches_include(Path::new("lib/utils.py")));
        assert!(!config.matches_include(Path::new("tests/test_main.py")));
    }

    #[test]
    fn test_extend_exclude_keeps_defaults() {
        let config = Config {
            extend_exclude: vec!["**/generated/**".to_string()],
            ..Default::default()
        };
        assert!(config.matches_exclude(Path::new("a/node_modules/foo.js")));
        assert!(config.matches_exclude(Path::new("src/generated/schema.py")));
    }

    #[test]
    fn test_exclude_replaces_defaults() {
        let config = Config {
            exclude: vec!["**/skip/**".to_string()],
            ..Default::default()
        };
        assert!(!config.matches_exclude(Path::new("a/node_modules/foo.js")));
        assert!(config.matches_exclude(Path::new("a/skip/foo.js")));
    }

    #[test]
    fn test_load_refmap_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("refmap.toml"),
            "damping = 0.5\npreview-lines = 5\nmap-tokens = 100\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.damping, Some(0.5));
        assert_eq!(config.ranking_config().damping, 0.5);
        assert_eq!(config.render_config().preview_lines, 5);
        assert_eq!(config.render_config().max_tokens, Some(100));
        assert!(config.display_summary().contains("refmap.toml"));
    }

    #[test]
    fn test_load_pyproject_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            "[project]\nname = \"x\"\n\n[tool.refmap]\ninclude = [\"src/**\"]\n",
        )
        .unwrap();
        let nested = dir.path().join("pkg");
        fs::create_dir(&nested).unwrap();

        let config = Config::load(&nested).unwrap();
        assert_eq!(config.include, vec!["src/**".to_string()]);
    }

    #[test]
    fn test_invalid_refmap_toml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("refmap.toml"), "damping = 2.0\n").unwrap();
        assert!(Config::load(dir.path()).is_err());

        fs::write(dir.path().join("refmap.toml"), "no-such-key = 1\n").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.render_config(), RenderConfig::default());
    }
}
