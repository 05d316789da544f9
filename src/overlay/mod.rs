//! Overlay core: layering, collision resolution, support attachment,
//! and the manifest.

pub mod builder;
pub mod error;
pub mod layer;
pub mod manifest;
pub mod support;

pub use builder::Builder;
pub use error::{OverlayError, OverlayResult};
pub use layer::{AddOutcome, Layer, PLACEHOLDER};
pub use manifest::{MANIFEST_FILE, Manifest};
pub use support::{SupportPaths, SupportSpec};

use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;

/// Build the overlay from scratch: delete any previous overlay
/// directory, layer every configured root, attach support files, and
/// write the manifest.
pub fn create(config: &Config) -> OverlayResult<Manifest> {
    let overlay_path = &config.overlay.path;
    if overlay_path.exists() {
        fs::remove_dir_all(overlay_path)?;
    }

    let mut builder = Builder::new(overlay_path)?;
    builder.build(&config.overlay.roots)?;
    builder.attach_support(&config.support.files, config.support.needy_files_optional)?;

    let manifest = builder.into_manifest();
    manifest.write(overlay_path)?;
    info!(layers = manifest.search_path.len(), overlay = %overlay_path.display(), "overlay built");
    Ok(manifest)
}

/// Read a previously built overlay's manifest and return the absolute
/// layer directories, in search order. This is what a consumer uses in
/// place of its original search path.
pub fn search_path(config: &Config) -> OverlayResult<Vec<PathBuf>> {
    let manifest = Manifest::load(&config.overlay.path)?;
    let base = std::path::absolute(&config.overlay.path)?;
    Ok(manifest.absolute_paths(&base))
}
