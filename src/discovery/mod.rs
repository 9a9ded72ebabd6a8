//! Git-aware file discovery.
//!
//! Uses the `ignore` crate to respect .gitignore and walk directories in
//! parallel, keeping files whose extension maps to a known language.

mod files;

pub use files::find_source_files;
