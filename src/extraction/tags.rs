//! Tag extraction orchestration.
//!
//! [`TagExtractor`] owns an ordered list of backends and hands each file to
//! the first one that supports its language:
//!
//! 1. tree-sitter, when a grammar and query exist for the language
//! 2. the keyword lexer otherwise, including files whose language is
//!    unknown (those are lexed as [`GENERIC_LANGUAGE`])
//!
//! Extraction never fails past this boundary: [`TagExtractor::extract`]
//! swallows errors into an empty list. Callers that want the cause (the tag
//! cache records it) use [`TagExtractor::try_extract`].

use crate::error::ExtractError;
use crate::extraction::language::detect_language;
use crate::extraction::lexer::LexerBackend;
use crate::extraction::treesitter::TreeSitterBackend;
use crate::types::{SourceFile, Tag};

/// Language name used when detection found nothing.
pub const GENERIC_LANGUAGE: &str = "generic";

/// A pluggable way of turning file content into tags.
pub trait ExtractionBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Whether this backend can handle `language`
    fn supports(&self, language: &str) -> bool;

    fn extract(
        &self,
        file: &SourceFile,
        content: &str,
        language: &str,
    ) -> Result<Vec<Tag>, ExtractError>;
}

/// Drop names that can't be meaningful symbols: empty strings and single
/// non-alphabetic characters.
pub(crate) fn is_meaningful_name(name: &str) -> bool {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (None, _) => false,
        (Some(c), None) => c.is_alphabetic(),
        _ => true,
    }
}

pub struct TagExtractor {
    backends: Vec<Box<dyn ExtractionBackend>>,
}

impl TagExtractor {
    /// Tree-sitter first, lexer as fallback.
    pub fn new() -> Self {
        Self::with_backends(vec![
            Box::new(TreeSitterBackend::new()),
            Box::new(LexerBackend::new()),
        ])
    }

    pub fn with_backends(backends: Vec<Box<dyn ExtractionBackend>>) -> Self {
        Self { backends }
    }

    /// Extract tags, reporting why it failed if it did.
    pub fn try_extract(
        &self,
        file: &SourceFile,
        content: &str,
        language: Option<&str>,
    ) -> Result<Vec<Tag>, ExtractError> {
        let language = language.unwrap_or(GENERIC_LANGUAGE);
        let backend = self
            .backends
            .iter()
            .find(|b| b.supports(language))
            .ok_or_else(|| ExtractError::LanguageUnsupported {
                path: file.rel_fname.to_string(),
                language: language.to_string(),
            })?;

        let tags = backend.extract(file, content, language)?;
        tracing::debug!(
            "{}: {} tags via {} ({})",
            file.rel_fname,
            tags.len(),
            backend.name(),
            language
        );
        Ok(tags)
    }

    /// Extract tags; any failure yields an empty list.
    pub fn extract(&self, file: &SourceFile, content: &str, language: Option<&str>) -> Vec<Tag> {
        self.try_extract(file, content, language).unwrap_or_else(|e| {
            tracing::debug!("extraction failed: {}", e);
            Vec::new()
        })
    }

    /// Read `file` from disk, detect its language and extract.
    pub fn extract_file(&self, file: &SourceFile) -> Result<Vec<Tag>, ExtractError> {
        let path = file.path();
        let content = std::fs::read_to_string(&path).map_err(|source| ExtractError::FileRead {
            path: file.rel_fname.to_string(),
            source,
        })?;
        self.try_extract(file, &content, detect_language(&path))
    }
}

impl Default for TagExtractor {
    fn default() -> Self {
        Self::new()
    }
}
