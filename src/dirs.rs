//! XDG directory utilities for dictado.

use std::path::PathBuf;

use anyhow::{Context, Result};
use xdg::BaseDirectories;

const APP_NAME: &str = "dictado";

fn base_dirs() -> BaseDirectories {
    BaseDirectories::with_prefix(APP_NAME)
}

/// Return the XDG config directory (no creation - config may not exist yet).
/// `~/.config/dictado/`
pub fn config_dir() -> Result<PathBuf> {
    base_dirs()
        .get_config_home()
        .context("Could not determine config directory (HOME not set?)")
}

/// Return the XDG cache directory, creating it if needed.
/// `~/.cache/dictado/`
pub fn cache_dir() -> Result<PathBuf> {
    let dir = base_dirs()
        .get_cache_home()
        .context("Could not determine cache directory (HOME not set?)")?;
    std::fs::create_dir_all(&dir).context("Failed to create cache directory")?;
    Ok(dir)
}
