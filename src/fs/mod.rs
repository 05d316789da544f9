//! Filesystem path utilities.
//!
//! Pure, lexical path manipulation used by the overlay core. Nothing in
//! this module touches the filesystem.

pub mod path;
