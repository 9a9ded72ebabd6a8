//! Language detection from file extensions.
//!
//! Languages are plain `&'static str` names. The structural backend knows a
//! subset of them (see [`super::treesitter`]); the lexer backend has keyword
//! profiles for many of the rest and lexes anything else generically.

use std::path::Path;

/// Map a (lowercase) file extension to a language name.
pub fn extension_to_language(ext: &str) -> Option<&'static str> {
    match ext {
        "py" | "pyi" | "pyw" => Some("python"),
        "rs" => Some("rust"),
        "js" | "mjs" | "cjs" | "jsx" => Some("javascript"),
        "ts" | "mts" | "cts" => Some("typescript"),
        "tsx" => Some("tsx"),
        "go" => Some("go"),
        "java" => Some("java"),
        "c" => Some("c"),
        "h" | "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => Some("cpp"),
        "rb" | "rake" | "gemspec" => Some("ruby"),
        "php" | "php3" | "php4" | "php5" | "phtml" => Some("php"),
        "cs" => Some("c_sharp"),
        // Lexer-only languages
        "kt" | "kts" => Some("kotlin"),
        "scala" | "sc" => Some("scala"),
        "swift" => Some("swift"),
        "lua" => Some("lua"),
        "sh" | "bash" | "zsh" => Some("shell"),
        "pl" | "pm" => Some("perl"),
        "ex" | "exs" => Some("elixir"),
        "dart" => Some("dart"),
        "r" => Some("r"),
        "jl" => Some("julia"),
        "zig" => Some("zig"),
        _ => None,
    }
}

/// Detect the language of a path, `None` when unknown.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    extension_to_language(&ext)
}

/// Whether files with this path are worth handing to the extractor at all.
pub fn is_supported_path(path: &Path) -> bool {
    detect_language(path).is_some()
}
