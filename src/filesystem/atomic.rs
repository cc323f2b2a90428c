// src/filesystem/atomic.rs

//! Crash-consistent file replacement

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Replace `path` with `content`
///
/// The content goes to a temporary file in the same directory, is synced,
/// and is then renamed over `path`. Readers see either the old or the new
/// content, never a mix.
pub fn atomic_write_file(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        Error::IoError(format!("Cannot get parent directory for {}", path.display()))
    })?;
    fs::create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    debug!(
        "Atomically writing {} bytes to {} via {}",
        content.len(),
        path.display(),
        temp_file.path().display()
    );

    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(path).map_err(|e| {
        Error::IoError(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;

    if let Ok(dir_handle) = fs::File::open(dir) {
        // Not every filesystem supports syncing a directory
        let _ = dir_handle.sync_all();
    }
    Ok(())
}
