//! Generic lexical fallback for languages without a structural grammar.
//!
//! Every name-like token becomes a tag. A name is a definition when the
//! token right before it is a keyword of the language (`def foo`, `fun bar`,
//! `class Baz`), otherwise a reference. This misreads plenty of cases
//! (`import os` makes `os` a definition, `return x` makes `x` one) and that
//! bias is kept as-is. Positions are not tracked on this path, so `line` is
//! always `None`.
//!
//! Languages without a profile of their own (or files whose language could
//! not be detected at all) are lexed with [`GENERIC`], which pools the
//! declaration keywords of many languages.

use once_cell::sync::Lazy;
use regex::Regex;

use super::tags::{is_meaningful_name, ExtractionBackend};
use crate::error::ExtractError;
use crate::types::{SourceFile, Tag, TagKind};

/// Keyword set and comment markers for one language.
#[derive(Debug)]
pub struct LexerProfile {
    pub language: &'static str,
    pub keywords: &'static [&'static str],
    pub line_comments: &'static [&'static str],
}

impl LexerProfile {
    fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(&word)
    }
}

const HASH: &[&str] = &["#"];
const SLASHES: &[&str] = &["//"];
const DASHES: &[&str] = &["--"];

static PROFILES: &[LexerProfile] = &[
    LexerProfile {
        language: "python",
        keywords: &[
            "def", "class", "lambda", "return", "import", "from", "as", "if", "elif", "else",
            "for", "while", "in", "not", "and", "or", "is", "with", "try", "except", "finally",
            "raise", "yield", "global", "nonlocal", "pass", "break", "continue", "async",
            "await", "del", "assert",
        ],
        line_comments: HASH,
    },
    LexerProfile {
        language: "rust",
        keywords: &[
            "fn", "struct", "enum", "trait", "impl", "type", "mod", "use", "let", "mut",
            "const", "static", "pub", "crate", "super", "where", "for", "in", "if", "else",
            "match", "loop", "while", "return", "as", "dyn", "move", "ref", "unsafe", "async",
            "await", "macro_rules",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "javascript",
        keywords: &[
            "function", "class", "const", "let", "var", "new", "return", "import", "export",
            "from", "extends", "if", "else", "for", "while", "of", "in", "typeof", "instanceof",
            "async", "await", "yield", "static", "get", "set", "throw", "case", "default",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "typescript",
        keywords: &[
            "function", "class", "interface", "type", "enum", "namespace", "const", "let",
            "var", "new", "return", "import", "export", "from", "extends", "implements",
            "if", "else", "for", "while", "of", "in", "async", "await", "public", "private",
            "protected", "readonly", "static", "abstract", "declare",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "go",
        keywords: &[
            "func", "type", "struct", "interface", "package", "import", "var", "const",
            "return", "if", "else", "for", "range", "go", "defer", "chan", "map", "select",
            "switch", "case", "default",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "java",
        keywords: &[
            "class", "interface", "enum", "extends", "implements", "new", "return", "import",
            "package", "public", "private", "protected", "static", "final", "abstract",
            "void", "throws", "throw", "if", "else", "for", "while", "instanceof",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "c",
        keywords: &[
            "struct", "union", "enum", "typedef", "static", "extern", "const", "return", "if",
            "else", "for", "while", "switch", "case", "sizeof", "void", "int", "char", "long",
            "short", "unsigned", "signed", "float", "double",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "cpp",
        keywords: &[
            "class", "struct", "union", "enum", "namespace", "template", "typename", "typedef",
            "using", "virtual", "static", "const", "return", "new", "delete", "public",
            "private", "protected", "if", "else", "for", "while", "void", "int", "char",
            "bool", "auto",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "ruby",
        keywords: &[
            "def", "class", "module", "return", "if", "elsif", "else", "unless", "while",
            "until", "for", "in", "do", "end", "yield", "require", "include", "extend",
        ],
        line_comments: HASH,
    },
    LexerProfile {
        language: "php",
        keywords: &[
            "function", "class", "interface", "trait", "extends", "implements", "new",
            "return", "use", "namespace", "public", "private", "protected", "static", "if",
            "else", "foreach", "as", "while", "echo",
        ],
        line_comments: &["//", "#"],
    },
    LexerProfile {
        language: "c_sharp",
        keywords: &[
            "class", "interface", "struct", "enum", "namespace", "using", "new", "return",
            "public", "private", "protected", "internal", "static", "void", "override",
            "virtual", "async", "await", "var", "if", "else", "foreach", "in",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "kotlin",
        keywords: &[
            "fun", "class", "interface", "object", "val", "var", "return", "import", "package",
            "if", "else", "when", "for", "while", "in", "is", "as", "override", "private",
            "public", "internal", "data", "sealed", "enum",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "scala",
        keywords: &[
            "def", "class", "object", "trait", "val", "var", "type", "extends", "with", "new",
            "return", "import", "package", "if", "else", "match", "case", "for", "yield",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "swift",
        keywords: &[
            "func", "class", "struct", "enum", "protocol", "extension", "let", "var", "return",
            "import", "if", "else", "guard", "for", "in", "while", "init", "self", "static",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "lua",
        keywords: &[
            "function", "local", "return", "if", "then", "elseif", "else", "end", "for", "in",
            "while", "do", "repeat", "until", "and", "or", "not",
        ],
        line_comments: DASHES,
    },
    LexerProfile {
        language: "shell",
        keywords: &[
            "function", "local", "export", "if", "then", "elif", "else", "fi", "for", "in",
            "do", "done", "while", "case", "esac", "return",
        ],
        line_comments: HASH,
    },
    LexerProfile {
        language: "perl",
        keywords: &[
            "sub", "my", "our", "local", "package", "use", "require", "return", "if", "elsif",
            "else", "unless", "foreach", "for", "while",
        ],
        line_comments: HASH,
    },
    LexerProfile {
        language: "elixir",
        keywords: &[
            "def", "defp", "defmodule", "defmacro", "defstruct", "do", "end", "fn", "if",
            "else", "case", "cond", "with", "alias", "import", "require", "use",
        ],
        line_comments: HASH,
    },
    LexerProfile {
        language: "dart",
        keywords: &[
            "class", "enum", "mixin", "extension", "final", "const", "var", "void", "return",
            "import", "if", "else", "for", "in", "while", "new", "async", "await",
        ],
        line_comments: SLASHES,
    },
    LexerProfile {
        language: "r",
        keywords: &[
            "function", "return", "if", "else", "for", "in", "while", "repeat", "library",
        ],
        line_comments: HASH,
    },
    LexerProfile {
        language: "julia",
        keywords: &[
            "function", "struct", "mutable", "module", "macro", "abstract", "type", "const",
            "return", "if", "elseif", "else", "end", "for", "in", "while", "using", "import",
        ],
        line_comments: HASH,
    },
    LexerProfile {
        language: "zig",
        keywords: &[
            "fn", "pub", "const", "var", "struct", "enum", "union", "return", "if", "else",
            "for", "while", "switch", "try", "comptime",
        ],
        line_comments: SLASHES,
    },
];

/// Catch-all profile: declaration keywords from across language families
/// and every comment marker the tokenizer recognizes.
pub static GENERIC: LexerProfile = LexerProfile {
    language: "generic",
    keywords: &[
        "def", "fn", "fun", "func", "function", "class", "let", "var", "val", "const",
        "struct", "type", "interface", "enum", "trait", "module", "sub", "proc", "object",
        "data", "newtype", "method", "macro", "record", "union", "defn", "defun",
    ],
    line_comments: &["//", "#", "--"],
};

/// Profile for `language`, if the lexer has one for it specifically.
pub fn profile_for(language: &str) -> Option<&'static LexerProfile> {
    let language = match language {
        "tsx" => "typescript",
        "jsx" => "javascript",
        other => other,
    };
    PROFILES.iter().find(|p| p.language == language)
}

/// Profile for `language`, or [`GENERIC`] when there is none.
pub fn profile_or_generic(language: &str) -> &'static LexerProfile {
    profile_for(language).unwrap_or(&GENERIC)
}

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?P<comment>//[^\n]*|#[^\n]*|--[^\n]*)|(?P<string>"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*')|(?P<name>[A-Za-z_][A-Za-z0-9_]*)|(?P<other>\S)"#,
    )
    .expect("Invalid lexer token regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Keyword,
    Name(&'a str),
    Other,
}

/// Split `content` into tokens, dropping comments and whitespace.
fn tokenize<'a>(content: &'a str, profile: &LexerProfile) -> Vec<Token<'a>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(caps) = TOKEN.captures_at(content, pos) {
        let Some(whole) = caps.get(0) else { break };
        pos = whole.end();

        if let Some(comment) = caps.name("comment") {
            let text = comment.as_str();
            let is_comment = profile.line_comments.iter().any(|m| text.starts_with(m));
            if !is_comment {
                // Not a comment in this language (`#include`, `--x`): one
                // punctuation token, then keep scanning right after it.
                tokens.push(Token::Other);
                pos = comment.start() + 1;
            }
            continue;
        }

        if let Some(name) = caps.name("name") {
            let word = name.as_str();
            if profile.is_keyword(word) {
                tokens.push(Token::Keyword);
            } else {
                tokens.push(Token::Name(word));
            }
            continue;
        }

        tokens.push(Token::Other);
    }

    tokens
}

/// Keyword-driven lexical extraction.
#[derive(Debug, Default)]
pub struct LexerBackend;

impl LexerBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractionBackend for LexerBackend {
    fn name(&self) -> &'static str {
        "lexer"
    }

    /// Every language: unknown ones get the generic profile.
    fn supports(&self, _language: &str) -> bool {
        true
    }

    fn extract(
        &self,
        file: &SourceFile,
        content: &str,
        language: &str,
    ) -> Result<Vec<Tag>, ExtractError> {
        let profile = profile_or_generic(language);

        let tokens = tokenize(content, profile);
        let mut tags = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            let Token::Name(name) = *token else { continue };
            if !is_meaningful_name(name) {
                continue;
            }
            let after_keyword = i > 0 && tokens[i - 1] == Token::Keyword;
            let kind = if after_keyword { TagKind::Def } else { TagKind::Ref };
            tags.push(Tag::new(file, None, name, kind));
        }

        Ok(tags)
    }
}
