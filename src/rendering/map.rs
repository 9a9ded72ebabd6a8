//! Ranked map rendering with an optional token budget.

use std::fs;

use super::colors::Colorizer;
use crate::types::{RankedFile, RenderConfig};

/// Renders ranked files as preview blocks.
///
/// Blocks are ordered by rank descending, ties broken by `rel_fname`, so the
/// same input always renders byte-identically.
pub struct MapRenderer {
    config: RenderConfig,
    /// Token estimate for budgeting; defaults to chars / 4
    token_counter: Box<dyn Fn(&str) -> usize + Send + Sync>,
}

impl MapRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            token_counter: Box::new(|s: &str| (s.chars().count() + 3) / 4),
        }
    }

    /// Swap in a real tokenizer.
    pub fn with_token_counter(mut self, counter: Box<dyn Fn(&str) -> usize + Send + Sync>) -> Self {
        self.token_counter = counter;
        self
    }

    pub fn estimate_tokens(&self, text: &str) -> usize {
        (self.token_counter)(text)
    }

    pub fn render(&self, ranked: &[RankedFile]) -> String {
        let mut ordered: Vec<&RankedFile> = ranked.iter().collect();
        ordered.sort_by(|a, b| {
            b.rank
                .total_cmp(&a.rank)
                .then_with(|| a.rel_fname.cmp(&b.rel_fname))
        });

        let mut blocks: Vec<String> = Vec::with_capacity(ordered.len());
        let mut used = 0;

        for file in ordered {
            let block = self.render_block(file);

            if let Some(budget) = self.config.max_tokens {
                let cost = self.estimate_tokens(&block);
                if !blocks.is_empty() && used + cost > budget {
                    tracing::debug!(
                        "token budget {} reached after {} files",
                        budget,
                        blocks.len()
                    );
                    break;
                }
                used += cost;
            }

            blocks.push(block);
        }

        blocks.join("\n\n").trim().to_string()
    }

    fn render_block(&self, file: &RankedFile) -> String {
        let rank = format!("(rank: {:.4}):", file.rank);
        let preview = match self.preview(file) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Error reading file {}: {}", file.rel_fname, e);
                let marker = format!("Error reading file: {}", e);
                if self.config.color {
                    Colorizer::error(&marker)
                } else {
                    marker
                }
            }
        };

        if self.config.color {
            format!(
                "{} {}\n{}",
                Colorizer::file_path(&file.rel_fname),
                Colorizer::rank(&rank),
                preview
            )
        } else {
            format!("{} {}\n{}", file.rel_fname, rank, preview)
        }
    }

    /// First `preview_lines` lines, trimmed.
    fn preview(&self, file: &RankedFile) -> std::io::Result<String> {
        let content = fs::read_to_string(&*file.fname)?;
        let head: Vec<&str> = content
            .split_inclusive('\n')
            .take(self.config.preview_lines)
            .collect();
        Ok(head.concat().trim().to_string())
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}
