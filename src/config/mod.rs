use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::overlay::SupportSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub support: SupportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Directory the layer stack and manifest are written into.
    #[serde(default = "default_overlay_path")]
    pub path: PathBuf,
    /// Source roots in priority order; earlier roots shadow later ones.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportConfig {
    /// Skip support entries whose needy file was never placed, instead
    /// of failing the build.
    #[serde(default)]
    pub needy_files_optional: bool,
    /// root, to needy file, to one-or-more support paths.
    #[serde(default)]
    pub files: SupportSpec,
}

fn default_overlay_path() -> PathBuf {
    PathBuf::from("strata")
}

impl Config {
    /// Load configuration from the given file, or from `strata.*` in the
    /// working directory, with `STRATA_`-prefixed environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let builder = match path {
            Some(path) => config::Config::builder().add_source(config::File::from(path)),
            None => config::Config::builder()
                .add_source(config::File::with_name("strata").required(false)),
        };
        let config = builder.add_source(config::Environment::with_prefix("STRATA")).build()?;

        Ok(config.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { overlay: OverlayConfig::default(), support: SupportConfig::default() }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { path: default_overlay_path(), roots: Vec::new() }
    }
}
