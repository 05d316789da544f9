//! Strata - layered symlink overlay builder.
//!
//! Strata reduces an ordered list of overlapping source directory trees
//! ("roots") into a minimal ordered stack of conflict-free directory
//! trees ("layers"), each containing only symlinks and merge directories
//! pointing back into the original roots. Searching the layers in order
//! reproduces the file-visibility semantics of searching the roots in
//! order, without re-scanning the roots at lookup time.

pub mod config;
pub mod fs;
pub mod overlay;
