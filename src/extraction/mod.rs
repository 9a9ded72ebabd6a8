//! Tag extraction from source code.
//!
//! This module handles:
//! - Detecting a file's language from its extension
//! - Structural extraction with tree-sitter grammars and `.scm` queries
//! - A keyword-driven lexer fallback for everything else
//!
//! # Backend Selection
//!
//! [`TagExtractor`] asks each [`ExtractionBackend`] in turn whether it
//! supports the language; the first one that does handles the file.

mod language;
mod lexer;
mod tags;
mod treesitter;

pub use language::{detect_language, extension_to_language, is_supported_path};
pub use lexer::{profile_for, profile_or_generic, LexerBackend, LexerProfile, GENERIC};
pub use tags::{ExtractionBackend, TagExtractor, GENERIC_LANGUAGE};
pub use treesitter::{GrammarRegistry, LangConfig, TreeSitterBackend, STRUCTURAL_LANGUAGES};
