//! A single numbered layer of the overlay.
//!
//! A layer is one conflict-free directory tree under the overlay root,
//! holding symlinks back into the source roots plus real "merge"
//! directories where several roots contributed to the same directory.
//! Layers can be pushed down by placeholder levels so upward-relative
//! support links stay contained in the layer's own subtree.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::overlay::error::OverlayResult;

/// Directory name used for the placeholder levels inserted above a
/// layer's content when its depth is raised.
pub const PLACEHOLDER: &str = "__strata__";

/// Outcome of a single [`Layer::add`] attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// A fresh symlink was created at the requested path.
    Linked,
    /// Both the existing entry and the target are directories. The entry
    /// is now a real directory and the caller should place each child of
    /// the target individually.
    MergeInto,
    /// Something incompatible already occupies the path; nothing changed.
    Collision,
}

/// One numbered directory tree in the overlay.
#[derive(Debug)]
pub struct Layer {
    overlay_path: PathBuf,
    number: u32,
    depth: usize,
}

impl Layer {
    /// Create layer `number` under `overlay_path`, making its directory.
    pub fn create(overlay_path: &Path, number: u32) -> OverlayResult<Self> {
        let layer = Self { overlay_path: overlay_path.to_path_buf(), number, depth: 0 };
        fs::create_dir_all(layer.path())?;
        debug!(layer = number, "created layer");
        Ok(layer)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Placeholder levels currently inserted above the layer's content.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Fixed physical location of the layer: `<overlay>/<number>`.
    pub fn root(&self) -> PathBuf {
        self.overlay_path.join(self.number.to_string())
    }

    /// Effective physical location of the layer's content, accounting
    /// for placeholder depth.
    pub fn path(&self) -> PathBuf {
        let mut path = self.root();
        for _ in 0..self.depth {
            path.push(PLACEHOLDER);
        }
        path
    }

    /// Effective location relative to the overlay root, e.g. `1` or
    /// `1/__strata__`. This is what the manifest records.
    pub fn subpath(&self) -> PathBuf {
        let mut path = PathBuf::from(self.number.to_string());
        for _ in 0..self.depth {
            path.push(PLACEHOLDER);
        }
        path
    }

    /// Absolute location of `rel` inside this layer.
    pub fn path_of(&self, rel: &Path) -> PathBuf {
        self.path().join(rel)
    }

    /// True if `rel` is a plain file in this layer (through symlinks).
    pub fn is_file(&self, rel: &Path) -> bool {
        self.path_of(rel).is_file()
    }

    /// True if `rel` is a directory in this layer (through symlinks).
    pub fn is_directory(&self, rel: &Path) -> bool {
        self.path_of(rel).is_dir()
    }

    /// True if the layer holds at least one entry.
    pub fn has_entries(&self) -> bool {
        fs::read_dir(self.path()).map(|mut dir| dir.next().is_some()).unwrap_or(false)
    }

    /// Return the proper path-prefix of `rel` that is a plain file in
    /// this layer, if any.
    ///
    /// A file blocks every path nested beneath it: a file at `a/b`
    /// blocks `a/b/c`, but never blocks its own path.
    pub fn blocking_path(&self, rel: &Path) -> Option<PathBuf> {
        let mut current = self.path();
        let mut prefix = PathBuf::new();
        for component in rel.parent()?.components() {
            current.push(component);
            prefix.push(component);
            if current.is_file() {
                return Some(prefix);
            }
        }
        None
    }

    /// True if some proper path-prefix of `rel` is a plain file here.
    pub fn blocked(&self, rel: &Path) -> bool {
        self.blocking_path(rel).is_some()
    }

    /// Try to place a symlink to `target` at `rel` in this layer.
    ///
    /// Assumes `rel` is not blocked. If the path is free, the link is
    /// created (with parent directories as needed). If both sides are
    /// directories, the existing entry is materialized into a real
    /// directory and [`AddOutcome::MergeInto`] asks the caller to place
    /// the target's children one by one. Anything else is reported as a
    /// collision without mutating state.
    pub fn add(&self, rel: &Path, target: &Path) -> OverlayResult<AddOutcome> {
        let link = self.path_of(rel);

        if link.is_dir() && target.is_dir() {
            self.materialize_directory(&link)?;
            return Ok(AddOutcome::MergeInto);
        }

        if fs::symlink_metadata(&link).is_ok() {
            return Ok(AddOutcome::Collision);
        }

        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent)?;
        }
        symlink(target, &link)?;
        Ok(AddOutcome::Linked)
    }

    /// Raise the placeholder depth, relocating all existing content.
    ///
    /// No-op when the layer is already at least that deep, so the raise
    /// is idempotent and depth never decreases. The whole layer root is
    /// moved down by the depth delta in one piece: links attached at or
    /// above the old effective root (support files from earlier raises)
    /// keep the same position relative to the content and stay
    /// resolvable. The move is a two-rename dance through a temporary
    /// sibling of the layer root, with the destination chain
    /// pre-created, so an interruption leaves either the old or the new
    /// layout intact.
    pub fn raise_depth(&mut self, depth: usize) -> OverlayResult<()> {
        if depth <= self.depth {
            return Ok(());
        }
        let delta = depth - self.depth;

        let temp = self.overlay_path.join(format!(".{}.relocate", self.number));
        fs::rename(self.root(), &temp)?;

        let mut destination = self.root();
        for _ in 0..delta {
            destination.push(PLACEHOLDER);
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&temp, &destination)?;
        self.depth = depth;
        debug!(layer = self.number, depth, "relocated layer content");
        Ok(())
    }

    /// Replace a symlink-to-directory entry with a real directory
    /// holding one child symlink per entry of the old target.
    fn materialize_directory(&self, link: &Path) -> OverlayResult<()> {
        let metadata = fs::symlink_metadata(link)?;
        if !metadata.file_type().is_symlink() {
            return Ok(());
        }

        let prior_target = fs::read_link(link)?;
        fs::remove_file(link)?;
        fs::create_dir(link)?;
        for entry in fs::read_dir(&prior_target)? {
            let entry = entry?;
            symlink(entry.path(), link.join(entry.file_name()))?;
        }
        Ok(())
    }
}
