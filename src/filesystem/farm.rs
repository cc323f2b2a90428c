// src/filesystem/farm.rs

//! Symlink farm deployment
//!
//! Every installed program lives in its own install tree. The farm mirrors
//! each tree into one shared link directory: directories are real
//! directories, files are symlinks to the absolute path of the installed
//! file. Trees from different programs share ancestor directories but
//! never a file path; a collision is a [`Error::LinkConflict`].

use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// A shared link directory
#[derive(Debug, Clone)]
pub struct LinkFarm {
    root: PathBuf,
}

impl LinkFarm {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mirrored location of `path` under the farm root
    fn mirror(&self, install_dir: &Path, path: &Path) -> Result<PathBuf> {
        let relative = path.strip_prefix(install_dir).map_err(|_| {
            Error::IoError(format!(
                "{} is outside {}",
                path.display(),
                install_dir.display()
            ))
        })?;
        Ok(self.root.join(relative))
    }

    /// Link every file of `install_dir` into the farm
    ///
    /// Walks top-down following symlinks, so directories are created before
    /// the links inside them. Fails on the first destination that already
    /// exists; links made before the conflict are left for the caller to
    /// remove with [`LinkFarm::unlink`].
    pub fn link(&self, install_dir: &Path) -> Result<usize> {
        let install_dir = std::path::absolute(install_dir)?;
        let mut linked = 0;

        for entry in WalkDir::new(&install_dir).follow_links(true).sort_by_file_name() {
            let node = Node::from_walk(entry)?;
            let dest = self.mirror(&install_dir, &node.path)?;

            if node.is_dir {
                match fs::create_dir_all(&dest) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        return Err(Error::LinkConflict(dest));
                    }
                    Err(e) => return Err(e.into()),
                }
                continue;
            }

            if dest.symlink_metadata().is_ok() {
                warn!("Link conflict: {} already exists", dest.display());
                return Err(Error::LinkConflict(dest));
            }
            symlink(&node.path, &dest)?;
            linked += 1;
        }

        info!(
            "Linked {} files from {} into {}",
            linked,
            install_dir.display(),
            self.root.display()
        );
        Ok(linked)
    }

    /// Remove `install_dir`'s links from the farm
    ///
    /// Walks bottom-up so links go before their directories. Missing links
    /// are skipped, as are entries that are not symlinks back into
    /// `install_dir`; those belong to someone else. Mirrored directories are
    /// removed only once empty. Safe to repeat.
    ///
    /// If `install_dir` no longer exists, the farm itself is searched for
    /// links pointing into it instead.
    pub fn unlink(&self, install_dir: &Path) -> Result<usize> {
        let install_dir = std::path::absolute(install_dir)?;
        if !install_dir.exists() {
            debug!("{} is gone, sweeping the farm for its links", install_dir.display());
            return self.sweep(&install_dir);
        }

        let mut removed = 0;
        let walker = WalkDir::new(&install_dir)
            .follow_links(true)
            .contents_first(true)
            .min_depth(1);

        for entry in walker {
            let node = Node::from_walk(entry)?;
            let dest = self.mirror(&install_dir, &node.path)?;

            if node.is_dir {
                remove_empty_dir(&dest)?;
            } else if remove_link(&dest, &node.path)? {
                removed += 1;
            }
        }

        info!(
            "Unlinked {} files of {} from {}",
            removed,
            install_dir.display(),
            self.root.display()
        );
        Ok(removed)
    }

    /// Remove every farm link into a deleted `install_dir`
    ///
    /// Directories emptied by the removal are pruned up to the farm root.
    fn sweep(&self, install_dir: &Path) -> Result<usize> {
        if !self.root.is_dir() {
            return Ok(0);
        }

        let mut stale = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| Error::IoError(format!("Walk failed: {}", e)))?;
            if !entry.path_is_symlink() {
                continue;
            }
            if fs::read_link(entry.path())?.starts_with(install_dir) {
                stale.push(entry.into_path());
            }
        }

        for link in &stale {
            fs::remove_file(link)?;
            debug!("Removed stale link: {}", link.display());
            let mut dir = link.parent();
            while let Some(parent) = dir.filter(|d| *d != self.root.as_path()) {
                match fs::remove_dir(parent) {
                    Ok(()) => dir = parent.parent(),
                    Err(e) if e.kind() == ErrorKind::NotFound => dir = parent.parent(),
                    Err(e) if e.kind() == ErrorKind::DirectoryNotEmpty => break,
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if !stale.is_empty() {
            info!(
                "Removed {} stale links into {} from {}",
                stale.len(),
                install_dir.display(),
                self.root.display()
            );
        }
        Ok(stale.len())
    }
}

/// One path of an install tree as seen by a link-following walk
struct Node {
    path: PathBuf,
    is_dir: bool,
}

impl Node {
    /// Dangling symlinks fail to resolve; they are mirrored as plain files
    fn from_walk(entry: walkdir::Result<DirEntry>) -> Result<Self> {
        match entry {
            Ok(entry) => Ok(Self {
                is_dir: entry.file_type().is_dir(),
                path: entry.into_path(),
            }),
            Err(e) => {
                let dangling = e
                    .io_error()
                    .is_some_and(|io| io.kind() == ErrorKind::NotFound)
                    && e.path().is_some_and(|p| {
                        p.symlink_metadata()
                            .is_ok_and(|m| m.file_type().is_symlink())
                    });
                match e.path() {
                    Some(path) if dangling => {
                        debug!("Dangling symlink treated as a file: {}", path.display());
                        Ok(Self {
                            path: path.to_path_buf(),
                            is_dir: false,
                        })
                    }
                    _ => Err(Error::IoError(format!("Walk failed: {}", e))),
                }
            }
        }
    }
}

/// Remove `dest` if it is a symlink to `source`
fn remove_link(dest: &Path, source: &Path) -> Result<bool> {
    match fs::read_link(dest) {
        Ok(target) if target == source => {
            fs::remove_file(dest)?;
            Ok(true)
        }
        Ok(target) => {
            warn!(
                "Leaving {}: points at {}, not {}",
                dest.display(),
                target.display(),
                source.display()
            );
            Ok(false)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Link already removed: {}", dest.display());
            Ok(false)
        }
        Err(e) if e.kind() == ErrorKind::InvalidInput => {
            warn!("Leaving {}: not a symlink", dest.display());
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a mirrored directory if nothing else lives in it
fn remove_empty_dir(dest: &Path) -> Result<()> {
    match fs::remove_dir(dest) {
        Ok(()) => {
            debug!("Removed directory: {}", dest.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == ErrorKind::DirectoryNotEmpty => {
            debug!("Directory not empty, skipping: {}", dest.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotADirectory => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Link `install_dir` into `link_dir`
pub fn link(install_dir: &Path, link_dir: &Path) -> Result<usize> {
    LinkFarm::new(link_dir).link(install_dir)
}

/// Unlink `install_dir` from `link_dir`
pub fn unlink(install_dir: &Path, link_dir: &Path) -> Result<usize> {
    LinkFarm::new(link_dir).unlink(install_dir)
}
