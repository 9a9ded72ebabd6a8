//! refmap CLI
//!
//! Pipeline:
//!
//! 1. Discovery: source files under ROOT, respecting .gitignore and config
//! 2. Extraction: tags per file (cached, optionally on disk)
//! 3. Graph: referencer -> definer edges
//! 4. PageRank: importance per file
//! 5. Rendering: ranked previews, printed and saved
//!
//! Progress goes to stderr through tracing; stdout carries only the map.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use refmap::discovery::find_source_files;
use refmap::{Config, RepoMap};

/// Ranked map of a source repository
///
/// Files are ranked by how much the rest of the repository references the
/// symbols they define, then shown as short previews, most important first.
///
/// Examples:
///   refmap .                        # Map the current directory
///   refmap src --tokens 2048        # Budgeted map of src/
///   refmap . --focus src/lib.rs     # Bias ranking toward a file
///   refmap . --json --no-save       # Raw scores as JSON
#[derive(Parser, Debug)]
#[command(name = "refmap")]
#[command(version)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Repository root
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Approximate token budget for the map (chars / 4)
    #[arg(short = 't', long)]
    pub tokens: Option<usize>,

    /// Lines of each file shown in the preview
    #[arg(long)]
    pub preview_lines: Option<usize>,

    /// PageRank damping factor
    #[arg(long)]
    pub damping: Option<f64>,

    /// Files (relative to ROOT) to bias ranking toward; repeatable
    #[arg(short, long, value_name = "FILE")]
    pub focus: Vec<String>,

    /// Where to save the map
    #[arg(short, long, default_value = "repo_map.txt", conflicts_with = "no_save")]
    pub output: PathBuf,

    /// Print only, don't save
    #[arg(long)]
    pub no_save: bool,

    /// Print ranked files as JSON instead of the map
    #[arg(long)]
    pub json: bool,

    /// Persist extracted tags under ROOT/.refmap.cache
    #[arg(long)]
    pub cache: bool,

    /// Clear the persistent cache before running (implies --cache)
    #[arg(long)]
    pub refresh: bool,

    /// ANSI-styled headers
    #[arg(long)]
    pub color: bool,

    /// Progress messages on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Only these extensions (repeatable), e.g. -e py -e rs
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = run(&cli)?;
    println!("{}", output);

    if !cli.no_save && !cli.json {
        fs::write(&cli.output, &output)
            .with_context(|| format!("Failed to write map to {}", cli.output.display()))?;
        tracing::info!("Map saved to {}", cli.output.display());
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<String> {
    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("Failed to resolve root path '{}'", cli.root.display()))?;
    let config = Config::load(&root)?;

    for line in config.display_summary().lines() {
        tracing::debug!("{}", line);
    }

    let mut ranking = config.ranking_config();
    if let Some(d) = cli.damping {
        anyhow::ensure!((0.0..1.0).contains(&d), "--damping must be in [0, 1), got {}", d);
        ranking.damping = d;
    }

    let mut render = config.render_config();
    if let Some(n) = cli.preview_lines {
        render.preview_lines = n;
    }
    if cli.tokens.is_some() {
        render.max_tokens = cli.tokens;
    }
    render.color = cli.color;

    let files = find_source_files(&root, &config, &cli.extensions)?;
    tracing::info!("Found {} source files.", files.len());

    let mut repo_map = RepoMap::new(&root, ranking, render).with_focus(cli.focus.clone());
    if cli.cache || cli.refresh {
        repo_map = repo_map.with_disk_cache()?;
        if cli.refresh {
            repo_map.cache().clear();
        }
    }

    let output = if cli.json {
        let ranked = repo_map.rank_files(&files);
        serde_json::to_string_pretty(&ranked).context("Failed to serialize ranks")?
    } else {
        repo_map.get_repo_map(&files)
    };

    for (file, cause) in repo_map.cache().failures() {
        tracing::debug!("skipped {}: {}", file, cause);
    }
    let stats = repo_map.cache().stats();
    tracing::info!(
        "Tags: {} files, {} extracted, {} failed",
        stats.entries,
        stats.extractions,
        stats.failures
    );
    if let Some(disk) = stats.disk {
        tracing::info!(
            "Disk cache: {} files, {} tags ({} definitions)",
            disk.files,
            disk.tags,
            disk.defs
        );
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_minimal() {
        let cli = Cli::parse_from(["refmap"]);
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.output, PathBuf::from("repo_map.txt"));
        assert_eq!(cli.tokens, None);
        assert!(!cli.color);
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_parse_options() {
        let cli = Cli::parse_from([
            "refmap",
            "repo",
            "--tokens",
            "1024",
            "--preview-lines",
            "5",
            "--damping",
            "0.9",
            "--focus",
            "a.py",
            "--focus",
            "b.py",
            "-e",
            "py",
            "--cache",
            "-v",
        ]);
        assert_eq!(cli.root, PathBuf::from("repo"));
        assert_eq!(cli.tokens, Some(1024));
        assert_eq!(cli.preview_lines, Some(5));
        assert_eq!(cli.damping, Some(0.9));
        assert_eq!(cli.focus, vec!["a.py", "b.py"]);
        assert_eq!(cli.extensions, vec!["py"]);
        assert!(cli.cache && cli.verbose);
    }

    #[test]
    fn test_output_conflicts_with_no_save() {
        assert!(Cli::try_parse_from(["refmap", "--no-save", "-o", "x.txt"]).is_err());
        assert!(Cli::try_parse_from(["refmap", "--no-save"]).is_ok());
    }

    #[test]
    fn test_run_on_temp_repo() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("a.py"), "def foo():\n    pass\n")?;
        fs::write(dir.path().join("b.py"), "foo()\n")?;

        let root = dir.path().to_string_lossy().to_string();
        let cli = Cli::parse_from(["refmap", root.as_str(), "--no-save"]);
        let output = run(&cli)?;
        assert!(output.starts_with("a.py (rank: "));
        assert!(output.contains("b.py (rank: "));

        let cli = Cli::parse_from(["refmap", root.as_str(), "--json", "--no-save"]);
        let ranked: Vec<refmap::RankedFile> = serde_json::from_str(&run(&cli)?)?;
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].rel_fname.as_ref(), "a.py");
        Ok(())
    }

    #[test]
    fn test_bad_root_is_error() {
        let cli = Cli::parse_from(["refmap", "/nonexistent/refmap/root"]);
        assert!(run(&cli).is_err());
    }
}
