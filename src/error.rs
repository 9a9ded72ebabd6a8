//! Per-file extraction errors.
//!
//! None of these are fatal: the cache logs them and substitutes an empty tag
//! list, so one bad file only loses its own contribution to the graph.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("no extractor for {path} (language: {language})")]
    LanguageUnsupported { path: String, language: String },
}

impl ExtractError {
    pub fn path(&self) -> &str {
        match self {
            ExtractError::FileRead { path, .. }
            | ExtractError::Parse { path, .. }
            | ExtractError::LanguageUnsupported { path, .. } => path,
        }
    }
}
