//! Counts lines of code per language over files and directory trees.
//!
//! Each file is run through a small line classifier that tells code from
//! blank and commented-out lines. Directories are walked concurrently on a
//! bounded worker pool and their per-language counts are merged up the tree.

pub mod analysis;
pub mod cli;
pub mod config_reader;
pub mod log_sink;
pub mod output;
pub mod registry;
pub mod results;
pub mod walker;

pub use registry::LangRegistry;
pub use results::{DirResult, FileResult};
pub use walker::{WalkOptions, Walker, WalkerError};

/// Counts `root` with the built-in languages and default options.
pub fn count_lines_of_code(root: impl AsRef<std::path::Path>) -> Result<DirResult, WalkerError> {
    let walker = Walker::new(LangRegistry::builtin())?;
    Ok(walker.count_lines_of_code(root))
}
