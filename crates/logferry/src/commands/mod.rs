//! Command implementations

pub mod collect;
pub mod forward;
pub mod rotate;

use std::path::Path;

use anyhow::Context;
use logferry_core::ConfigFile;

/// Load the configuration. An explicit path must exist; without one the
/// usual locations are searched and absence falls back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ConfigFile> {
    let config = match path {
        Some(path) => ConfigFile::load(path)
            .with_context(|| format!("cannot read config {}", path.display()))?,
        None => ConfigFile::discover()?,
    };
    Ok(config)
}
