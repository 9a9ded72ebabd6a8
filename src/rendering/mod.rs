//! Output rendering - from ranked files to the map text.
//!
//! Each file becomes one block, highest rank first:
//!
//! ```text
//! src/lib.rs (rank: 0.4120):
//! <first N lines of the file>
//! ```

mod colors;
mod map;

pub use colors::Colorizer;
pub use map::MapRenderer;
