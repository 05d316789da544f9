//! Overlay builder and collision resolver.
//!
//! The builder walks every source root in priority order and places each
//! top-level entry into the lowest layer that can hold it, resolving
//! collisions by merging directories, cascading entries to deeper layers,
//! or displacing already-placed files. Layers are created lazily, so the
//! finished stack is as short as the inputs allow.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::layer::{AddOutcome, Layer};
use crate::overlay::manifest::Manifest;
use crate::overlay::support::{self, SupportSpec};

/// Builds the layer stack for one overlay directory.
pub struct Builder {
    overlay_path: PathBuf,
    layers: Vec<Layer>,
}

impl Builder {
    /// Create a builder for `overlay_path`, making the directory.
    pub fn new(overlay_path: &Path) -> OverlayResult<Self> {
        fs::create_dir_all(overlay_path)?;
        Ok(Self { overlay_path: overlay_path.to_path_buf(), layers: Vec::new() })
    }

    /// Place every top-level entry of every root, in root order.
    ///
    /// Roots that do not exist or are not directories are skipped.
    /// Children of each root are placed in sorted name order, so a build
    /// is deterministic regardless of platform listing order.
    pub fn build(&mut self, roots: &[PathBuf]) -> OverlayResult<()> {
        for root in roots {
            let root = std::path::absolute(root)?;
            if !root.is_dir() {
                debug!(root = %root.display(), "skipping root: not a directory");
                continue;
            }
            info!(root = %root.display(), "layering root");
            for name in sorted_entries(&root)? {
                self.place_at(0, Path::new(&name), &root.join(&name))?;
            }
        }
        Ok(())
    }

    /// Attach the configured support files to their needy files' layers.
    /// Must run after all roots are placed.
    pub fn attach_support(
        &mut self,
        spec: &SupportSpec,
        needy_files_optional: bool,
    ) -> OverlayResult<()> {
        support::attach(&mut self.layers, spec, needy_files_optional)
    }

    /// Collect the ordered manifest of in-use layer sub-paths.
    pub fn into_manifest(self) -> Manifest {
        Manifest::from_layers(&self.layers)
    }

    /// Place a symlink to `target` at `rel`, starting the search at
    /// `idx` and moving deeper past blocked or incompatible layers.
    fn place_at(&mut self, mut idx: usize, rel: &Path, target: &Path) -> OverlayResult<()> {
        while self.layer(idx)?.blocked(rel) {
            idx += 1;
        }

        match self.layer(idx)?.add(rel, target)? {
            AddOutcome::Linked => Ok(()),
            AddOutcome::MergeInto => {
                for name in sorted_entries(target)? {
                    self.place_at(idx, &rel.join(&name), &target.join(&name))?;
                }
                Ok(())
            }
            AddOutcome::Collision => self.resolve_collision(idx, rel, target),
        }
    }

    /// Classify and resolve a collision reported by layer `idx`.
    fn resolve_collision(&mut self, idx: usize, rel: &Path, target: &Path) -> OverlayResult<()> {
        if self.layers[idx].is_directory(rel) {
            // dir/file: cascade to the next layer without a directory
            // in the way.
            let mut next = idx + 1;
            while self.layer(next)?.is_directory(rel) {
                next += 1;
            }
            debug!(rel = %rel.display(), layer = next as u32 + 1, "directory shadows file, cascading");
            self.place_at(next, rel, target)
        } else if target.is_dir() {
            // file/dir: evacuate the file to a deeper layer, then take
            // this one for the directory.
            debug!(rel = %rel.display(), layer = idx as u32 + 1, "displacing file for directory");
            self.displace(idx, rel)?;
            match self.layers[idx].add(rel, target)? {
                AddOutcome::Linked => Ok(()),
                _ => Err(OverlayError::InvariantViolation(format!(
                    "{} still occupied in layer {} after displacement",
                    rel.display(),
                    idx + 1
                ))),
            }
        } else {
            // file/file: the earlier root's entry keeps shadowing this one.
            debug!(rel = %rel.display(), target = %target.display(), "dropping shadowed file");
            Ok(())
        }
    }

    /// Move whatever sits at `rel` in layer `idx` one layer deeper,
    /// recursively making room below first.
    ///
    /// Terminates because every step moves an already-placed entry
    /// strictly deeper and the number of placed entries is finite.
    fn displace(&mut self, idx: usize, rel: &Path) -> OverlayResult<()> {
        let next = idx + 1;
        self.layer(next)?;

        let destination = self.layers[next].path_of(rel);
        if fs::symlink_metadata(&destination).is_ok() {
            self.displace(next, rel)?;
        } else if let Some(blocking) = self.layers[next].blocking_path(rel) {
            self.displace(next, &blocking)?;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(self.layers[idx].path_of(rel), &destination)?;
        Ok(())
    }

    /// Layer at index `idx` (zero-based; layer numbers start at 1),
    /// creating it and any missing shallower layers on first use.
    fn layer(&mut self, idx: usize) -> OverlayResult<&Layer> {
        while self.layers.len() <= idx {
            let number = self.layers.len() as u32 + 1;
            self.layers.push(Layer::create(&self.overlay_path, number)?);
        }
        Ok(&self.layers[idx])
    }
}

/// Names of the entries directly under `dir`, sorted.
fn sorted_entries(dir: &Path) -> OverlayResult<Vec<std::ffi::OsString>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name());
    }
    names.sort();
    Ok(names)
}
