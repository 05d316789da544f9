//! Overlay manifest.
//!
//! The manifest is the only artifact a consumer reads: the ordered list
//! of layer sub-paths (relative to the overlay root) to use as its
//! search path, persisted as JSON at the overlay root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::overlay::error::OverlayResult;
use crate::overlay::layer::Layer;

/// Manifest file name inside the overlay directory.
pub const MANIFEST_FILE: &str = "metadata.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Layer sub-paths relative to the overlay root, in layer order,
    /// e.g. `["1/__strata__", "2"]`. Empty layers are omitted.
    pub search_path: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Manifest {
    /// Collect the effective sub-path of every in-use layer, in
    /// ascending layer-number order.
    pub fn from_layers(layers: &[Layer]) -> Self {
        let search_path = layers
            .iter()
            .filter(|layer| layer.has_entries())
            .map(|layer| layer.subpath().to_string_lossy().into_owned())
            .collect();
        Self { search_path, created_at: Utc::now() }
    }

    /// Persist the manifest at the overlay root.
    pub fn write(&self, overlay_path: &Path) -> OverlayResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(overlay_path.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    /// Load the manifest from an overlay directory.
    pub fn load(overlay_path: &Path) -> OverlayResult<Self> {
        let data = fs::read_to_string(overlay_path.join(MANIFEST_FILE))?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Map the recorded sub-paths onto `overlay_path`, preserving order.
    pub fn absolute_paths(&self, overlay_path: &Path) -> Vec<PathBuf> {
        self.search_path.iter().map(|sub| overlay_path.join(sub)).collect()
    }
}
