//! ANSI styling for map headers.
//!
//! Only the header line of each block is styled; previews are file content
//! and stay verbatim.

use owo_colors::OwoColorize;

pub struct Colorizer;

impl Colorizer {
    /// File path header (bold blue)
    pub fn file_path(s: &str) -> String {
        s.bright_blue().bold().to_string()
    }

    /// Rank annotation, e.g. "(rank: 0.1234):"
    pub fn rank(s: &str) -> String {
        s.dimmed().to_string()
    }

    /// Read failures in place of a preview
    pub fn error(s: &str) -> String {
        s.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styles_keep_text() {
        for styled in [
            Colorizer::file_path("src/lib.rs"),
            Colorizer::rank("(rank: 0.5000):"),
            Colorizer::error("Error reading file: gone"),
        ] {
            assert!(styled.contains("\x1b["));
        }
        assert!(Colorizer::file_path("src/lib.rs").contains("src/lib.rs"));
    }
}
