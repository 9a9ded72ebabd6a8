//! Tree-sitter backend with embedded `.scm` tag queries.
//!
//! Each query uses two capture families:
//! - `@name.definition.<kind>` - identifier of a function/method/class/... declaration
//! - `@name.reference.<kind>` - any other identifier occurrence
//!
//! The reference patterns also match the declared identifiers themselves, so
//! a reference whose start byte coincides with a definition is dropped.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Parser as TsParser, Query, QueryCursor};

use super::tags::{is_meaningful_name, ExtractionBackend};
use crate::error::ExtractError;
use crate::types::{SourceFile, Tag, TagKind};

/// Embedded query files - compiled into the binary
mod queries {
    pub const PYTHON: &str = include_str!("../../queries/python-tags.scm");
    pub const RUST: &str = include_str!("../../queries/rust-tags.scm");
    pub const JAVASCRIPT: &str = include_str!("../../queries/javascript-tags.scm");
    pub const TYPESCRIPT: &str = include_str!("../../queries/typescript-tags.scm");
    pub const GO: &str = include_str!("../../queries/go-tags.scm");
    pub const JAVA: &str = include_str!("../../queries/java-tags.scm");
    pub const C: &str = include_str!("../../queries/c-tags.scm");
    pub const CPP: &str = include_str!("../../queries/cpp-tags.scm");
    pub const RUBY: &str = include_str!("../../queries/ruby-tags.scm");
    pub const PHP: &str = include_str!("../../queries/php-tags.scm");
    pub const C_SHARP: &str = include_str!("../../queries/c_sharp-tags.scm");
}

/// Languages with a grammar and a tag query.
pub const STRUCTURAL_LANGUAGES: &[&str] = &[
    "python",
    "rust",
    "javascript",
    "typescript",
    "tsx",
    "go",
    "java",
    "c",
    "cpp",
    "ruby",
    "php",
    "c_sharp",
];

/// Resolve a language name to its grammar, query source and canonical key.
fn grammar_for(name: &str) -> Option<(&'static str, Language, &'static str)> {
    let entry: (&'static str, Language, &'static str) = match name {
        "python" => ("python", tree_sitter_python::LANGUAGE.into(), queries::PYTHON),
        "rust" => ("rust", tree_sitter_rust::LANGUAGE.into(), queries::RUST),
        "javascript" | "jsx" => (
            "javascript",
            tree_sitter_javascript::LANGUAGE.into(),
            queries::JAVASCRIPT,
        ),
        "typescript" => (
            "typescript",
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            queries::TYPESCRIPT,
        ),
        "tsx" => (
            "tsx",
            tree_sitter_typescript::LANGUAGE_TSX.into(),
            queries::TYPESCRIPT,
        ),
        "go" => ("go", tree_sitter_go::LANGUAGE.into(), queries::GO),
        "java" => ("java", tree_sitter_java::LANGUAGE.into(), queries::JAVA),
        "c" => ("c", tree_sitter_c::LANGUAGE.into(), queries::C),
        "cpp" | "c++" => ("cpp", tree_sitter_cpp::LANGUAGE.into(), queries::CPP),
        "ruby" => ("ruby", tree_sitter_ruby::LANGUAGE.into(), queries::RUBY),
        "php" => ("php", tree_sitter_php::LANGUAGE_PHP.into(), queries::PHP),
        "c_sharp" => (
            "c_sharp",
            tree_sitter_c_sharp::LANGUAGE.into(),
            queries::C_SHARP,
        ),
        _ => return None,
    };
    Some(entry)
}

/// A compiled grammar + tag query.
pub struct LangConfig {
    language: Language,
    query: Query,
}

/// Lazily compiled grammars, one per language.
///
/// A language is compiled the first time a file of that language is
/// extracted and reused afterwards by every thread. A query that fails to
/// compile is remembered as `None` so the failure is logged once.
#[derive(Default)]
pub struct GrammarRegistry {
    configs: DashMap<&'static str, Option<Arc<LangConfig>>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled config for `language`, compiling it on first use.
    pub fn get(&self, language: &str) -> Option<Arc<LangConfig>> {
        let (key, grammar, query_src) = grammar_for(language)?;

        if let Some(entry) = self.configs.get(key) {
            return entry.value().clone();
        }

        // entry() holds the shard lock, so concurrent first uses compile once
        self.configs
            .entry(key)
            .or_insert_with(|| match Query::new(&grammar, query_src) {
                Ok(query) => {
                    tracing::debug!("compiled tag query for {}", key);
                    Some(Arc::new(LangConfig {
                        language: grammar,
                        query,
                    }))
                }
                Err(e) => {
                    tracing::warn!("failed to compile tag query for {}: {}", key, e);
                    None
                }
            })
            .value()
            .clone()
    }

    /// Number of languages compiled (or attempted) so far.
    pub fn loaded(&self) -> usize {
        self.configs.len()
    }
}

thread_local! {
    /// Tree-sitter parsers are not thread-safe; each worker keeps its own.
    static TS_PARSER: RefCell<TsParser> = RefCell::new(TsParser::new());
}

/// Structural extraction through tree-sitter.
#[derive(Default)]
pub struct TreeSitterBackend {
    registry: GrammarRegistry,
}

impl TreeSitterBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &GrammarRegistry {
        &self.registry
    }

    fn run_query(
        config: &LangConfig,
        file: &SourceFile,
        content: &str,
    ) -> Result<Vec<Tag>, ExtractError> {
        let tree = TS_PARSER.with(|cell| {
            let mut parser = cell.borrow_mut();
            parser
                .set_language(&config.language)
                .map_err(|e| e.to_string())?;
            parser
                .parse(content, None)
                .ok_or_else(|| "parser returned no tree".to_string())
        });
        let tree = tree.map_err(|reason| ExtractError::Parse {
            path: file.rel_fname.to_string(),
            reason,
        })?;

        let capture_names = config.query.capture_names();
        let source = content.as_bytes();

        let mut defs: Vec<(usize, u32, &str)> = Vec::new();
        let mut refs: Vec<(usize, u32, &str)> = Vec::new();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&config.query, tree.root_node(), source);
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let capture_name = capture_names
                    .get(capture.index as usize)
                    .copied()
                    .unwrap_or("");
                let node = capture.node;
                let Ok(text) = node.utf8_text(source) else {
                    continue;
                };
                let entry = (node.start_byte(), node.start_position().row as u32, text);

                if capture_name.starts_with("name.definition.") {
                    defs.push(entry);
                } else if capture_name.starts_with("name.reference.") {
                    refs.push(entry);
                }
            }
        }

        let mut def_positions: HashSet<usize> = HashSet::new();
        let mut tags = Vec::with_capacity(defs.len() + refs.len());

        for (start, row, text) in defs {
            if is_meaningful_name(text) && def_positions.insert(start) {
                tags.push(Tag::new(file, Some(row), text, TagKind::Def));
            }
        }

        // A node can be matched by several reference patterns; count it once.
        let mut ref_positions: HashSet<usize> = HashSet::new();
        for (start, row, text) in refs {
            if def_positions.contains(&start) || !ref_positions.insert(start) {
                continue;
            }
            if is_meaningful_name(text) {
                tags.push(Tag::new(file, Some(row), text, TagKind::Ref));
            }
        }

        Ok(tags)
    }
}

impl ExtractionBackend for TreeSitterBackend {
    fn name(&self) -> &'static str {
        "tree-sitter"
    }

    fn supports(&self, language: &str) -> bool {
        self.registry.get(language).is_some()
    }

    fn extract(
        &self,
        file: &SourceFile,
        content: &str,
        language: &str,
    ) -> Result<Vec<Tag>, ExtractError> {
        let config = self
            .registry
            .get(language)
            .ok_or_else(|| ExtractError::LanguageUnsupported {
                path: file.rel_fname.to_string(),
                language: language.to_string(),
            })?;
        Self::run_query(&config, file, content)
    }
}
