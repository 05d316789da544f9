//! Support-file attachment.
//!
//! Some placed files ("needy" files) look up auxiliary resources
//! ("support" files) by relative path from their own location. Because a
//! needy file in the overlay is a symlink, a relative path that ascends
//! far enough would escape the layer's subtree and land among sibling
//! layers. The attacher raises the owning layer's placeholder depth just
//! enough to contain the ascent, then links the support file next to the
//! needy file's location.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::fs::path;
use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::layer::Layer;

/// One or more support paths for a single needy file.
///
/// Deserializes from either a bare string or a list of strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SupportPaths {
    One(String),
    Many(Vec<String>),
}

impl SupportPaths {
    pub fn paths(&self) -> &[String] {
        match self {
            SupportPaths::One(path) => std::slice::from_ref(path),
            SupportPaths::Many(paths) => paths,
        }
    }
}

/// Nested mapping: root directory, to needy file (relative to the root),
/// to its support paths (relative to the needy file's directory,
/// possibly ascending above the root).
pub type SupportSpec = BTreeMap<PathBuf, BTreeMap<PathBuf, SupportPaths>>;

/// Attach every configured support file, raising layer depths as needed.
///
/// A needy file never placed into any layer is fatal unless
/// `needy_files_optional`; a support file missing on disk is always
/// fatal.
pub fn attach(
    layers: &mut [Layer],
    spec: &SupportSpec,
    needy_files_optional: bool,
) -> OverlayResult<()> {
    for (root, needy_map) in spec {
        let root = std::path::absolute(root)?;
        for (needy_rel, supports) in needy_map {
            let Some(idx) = find_needy_layer(layers, &root, needy_rel) else {
                if needy_files_optional {
                    debug!(needy = %root.join(needy_rel).display(), "skipping missing needy file");
                    continue;
                }
                return Err(OverlayError::NeedyFileMissing(root.join(needy_rel)));
            };

            let needy_dir = needy_rel.parent().unwrap_or(Path::new(""));
            for support in supports.paths() {
                attach_one(&mut layers[idx], &root, needy_rel, needy_dir, Path::new(support))?;
            }
        }
    }
    Ok(())
}

fn attach_one(
    layer: &mut Layer,
    root: &Path,
    needy_rel: &Path,
    needy_dir: &Path,
    support_rel: &Path,
) -> OverlayResult<()> {
    let real = path::clean(&root.join(needy_dir).join(support_rel));
    if !real.exists() {
        return Err(OverlayError::SupportFileMissing(real));
    }

    // A support path that climbs above the needy file's nesting would
    // escape the layer's subtree; push the layer down to contain it.
    let ascents = path::ascents(support_rel) as i64;
    let required = ascents - path::dir_segments(needy_rel) as i64;
    if required > 0 && (layer.depth() as i64) < required {
        info!(
            layer = layer.number(),
            depth = required,
            support = %support_rel.display(),
            "raising layer depth to contain support path"
        );
        layer.raise_depth(required as usize)?;
    }

    let link = path::clean(&layer.path().join(needy_dir).join(support_rel));
    if fs::symlink_metadata(&link).is_err() {
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent)?;
        }
        symlink(&real, &link)?;
        debug!(link = %link.display(), target = %real.display(), "attached support file");
    }
    Ok(())
}

/// Find the layer whose entry at `needy_rel` resolves to the file at
/// `root/needy_rel`.
///
/// Comparison is by canonicalized real location, so needy files reached
/// through a symlinked parent directory are found too.
fn find_needy_layer(layers: &[Layer], root: &Path, needy_rel: &Path) -> Option<usize> {
    let expected = fs::canonicalize(root.join(needy_rel)).ok()?;
    layers.iter().position(|layer| {
        let candidate = layer.path_of(needy_rel);
        candidate.is_file()
            && fs::canonicalize(&candidate).map(|real| real == expected).unwrap_or(false)
    })
}
