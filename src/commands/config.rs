// src/commands/config.rs
//! Config file management

use anyhow::{Context, Result};
use pantry::Config;
use std::path::Path;
use tracing::info;

/// Write the effective config to `path`, overwriting whatever is there
pub fn cmd_create_conf(config: &Config, path: &Path) -> Result<()> {
    config
        .write(path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    info!("Wrote config to {}", path.display());
    println!("Config written to {}", path.display());
    Ok(())
}
