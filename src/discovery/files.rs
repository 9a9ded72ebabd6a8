//! Parallel, gitignore-aware source file discovery.
//!
//! A file is kept when:
//! - it isn't ignored by .gitignore / .git/info/exclude
//! - it passes the config's include/exclude globs (matched on the path
//!   relative to the root)
//! - its extension is in `extensions` if given, else it has a known language
//!
//! Results are sorted so repeated runs see the same file order.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};
use ignore::WalkBuilder;

use crate::config::Config;
use crate::extraction::is_supported_path;

pub fn find_source_files(directory: &Path, config: &Config, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let extensions: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    let wanted = |path: &Path| -> bool {
        if extensions.is_empty() {
            return is_supported_path(path);
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    };

    if directory.is_file() {
        return Ok(if wanted(directory) {
            vec![directory.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    if !directory.is_dir() {
        bail!("Path does not exist: {}", directory.display());
    }

    let walker = WalkBuilder::new(directory)
        .hidden(false) // let .gitignore decide
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .follow_links(false)
        .threads(0)
        .build_parallel();

    let files = Mutex::new(Vec::new());

    walker.run(|| {
        Box::new(|entry_result| {
            let Ok(entry) = entry_result else {
                // Unreadable entries (permissions, broken links) are skipped
                return ignore::WalkState::Continue;
            };
            let path = entry.path();
            if !path.is_file() || !wanted(path) {
                return ignore::WalkState::Continue;
            }

            let rel_path = path.strip_prefix(directory).unwrap_or(path);
            if !config.should_include(rel_path) {
                return ignore::WalkState::Continue;
            }

            if let Ok(mut files) = files.lock() {
                files.push(path.to_path_buf());
            }
            ignore::WalkState::Continue
        })
    });

    let mut files = files
        .into_inner()
        .map_err(|_| anyhow::anyhow!("Failed to unwrap mutex"))?;
    files.sort();

    tracing::debug!("discovered {} source files under {}", files.len(), directory.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn layout() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/main.py"), "def main(): pass\n").unwrap();
        fs::write(root.join("src/lib.rs"), "fn lib() {}\n").unwrap();
        fs::write(root.join("README.md"), "# readme\n").unwrap();
        fs::write(root.join("logo.png"), "fake").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x\n").unwrap();
        dir
    }

    #[test]
    fn test_keeps_known_languages_sorted() -> Result<()> {
        let dir = layout();
        let files = find_source_files(dir.path(), &Config::default(), &[])?;
        let rel: Vec<&Path> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap())
            .collect();
        assert_eq!(rel, vec![Path::new("src/lib.rs"), Path::new("src/main.py")]);
        Ok(())
    }

    #[test]
    fn test_explicit_extensions() -> Result<()> {
        let dir = layout();
        let files = find_source_files(dir.path(), &Config::default(), &[".PY".to_string()])?;
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/main.py"));
        Ok(())
    }

    #[test]
    fn test_config_include() -> Result<()> {
        let dir = layout();
        let config = Config {
            include: vec!["**/*.rs".to_string()],
            ..Default::default()
        };
        let files = find_source_files(dir.path(), &config, &[])?;
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/lib.rs"));
        Ok(())
    }

    #[test]
    fn test_gitignore_respected() -> Result<()> {
        let dir = layout();
        fs::write(dir.path().join(".gitignore"), "src/lib.rs\n")?;
        let files = find_source_files(dir.path(), &Config::default(), &[])?;
        assert!(files.iter().all(|f| !f.ends_with("src/lib.rs")));
        Ok(())
    }

    #[test]
    fn test_single_file_and_missing_path() -> Result<()> {
        let dir = layout();
        let single = dir.path().join("src/main.py");
        assert_eq!(find_source_files(&single, &Config::default(), &[])?, vec![single]);
        assert!(find_source_files(Path::new("/nonexistent/path/xyz"), &Config::default(), &[]).is_err());
        Ok(())
    }
}
