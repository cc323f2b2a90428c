// src/task/update.rs

//! Update an installed recipe
//!
//! The old install is parked at `<install_dir>_bak` while a fresh install is
//! attempted. If the new install fails, the old one is put back exactly as
//! it was, ledger entry included, and the failure is raised.

use crate::error::{Error, Result};
use crate::filesystem::LinkFarm;
use crate::ledger::{Ledger, LedgerEntry};
use crate::recipe::Recipe;
use crate::recipe::repo::remove_tree;
use crate::task::install::install_recipe;
use crate::task::{Context, Report, Task};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct UpdateTask {
    recipe: Arc<dyn Recipe>,
}

/// An install moved aside for the duration of an update
#[derive(Debug)]
pub(crate) struct SavedInstall {
    pub entry: LedgerEntry,
    pub backup: PathBuf,
}

impl UpdateTask {
    pub fn new(recipe: Arc<dyn Recipe>) -> Self {
        Self { recipe }
    }
}

impl Task for UpdateTask {
    fn run(&self, ctx: &mut Context) -> Result<Report> {
        let recipe = self.recipe.as_ref();
        let name = recipe.name().to_string();
        debug!("Updating: {}", name);

        let Some(old) = ctx.ledger.get(&name).cloned() else {
            info!("Not Installed: {}", name);
            return Ok(Report::NotInstalled { name });
        };

        let new_hash = recipe.cur_hash()?;
        if new_hash == old.hash {
            return Ok(Report::UpToDate {
                name,
                hash: old.hash,
            });
        }

        info!("Updating {} from {} to {}", name, old.hash, new_hash);
        let saved = save_old_install(recipe, &mut ctx.ledger)?;

        if let Err(e) = install_recipe(recipe, &mut ctx.ledger) {
            warn!("Update of {} failed, restoring previous install: {}", name, e);
            if let Err(restore_err) = restore_old_install(recipe, &mut ctx.ledger, saved) {
                error!("Failed to restore {}: {}", name, restore_err);
            }
            return Err(e);
        }

        if ctx.config.update.keep_backup {
            info!("Kept previous install at {}", saved.backup.display());
        } else {
            remove_tree(&saved.backup)?;
        }

        let to = ctx
            .ledger
            .get(&name)
            .map(|entry| entry.hash.clone())
            .unwrap_or(new_hash);
        Ok(Report::Updated {
            name,
            from: old.hash,
            to,
        })
    }
}

/// Move the current install aside and forget its ledger entry
///
/// Its links come out of the farm first; otherwise they would dangle and
/// collide with the new install's links. If a later step fails, the tree is
/// moved back and relinked before the error is returned, and the ledger is
/// left untouched.
pub(crate) fn save_old_install(recipe: &dyn Recipe, ledger: &mut Ledger) -> Result<SavedInstall> {
    let paths = recipe.paths();
    let backup = paths.backup_dir();
    let farm = LinkFarm::new(&paths.link_dir);

    farm.unlink(&paths.install_dir)?;
    match park_install(recipe, ledger, &backup) {
        Ok(entry) => {
            debug!("Saved {} to {}", recipe.name(), backup.display());
            Ok(SavedInstall { entry, backup })
        }
        Err(e) => {
            warn!("Could not save {}, putting it back: {}", recipe.name(), e);
            if backup.exists() && !paths.install_dir.exists() {
                if let Err(undo) = fs::rename(&backup, &paths.install_dir) {
                    error!("Failed to move {} back: {}", backup.display(), undo);
                }
            }
            if let Err(undo) = farm.link(&paths.install_dir) {
                error!("Failed to relink {}: {}", recipe.name(), undo);
            }
            Err(e)
        }
    }
}

/// Rename the install tree to `backup` and drop its ledger entry
fn park_install(recipe: &dyn Recipe, ledger: &mut Ledger, backup: &Path) -> Result<LedgerEntry> {
    let paths = recipe.paths();

    if backup.exists() {
        warn!("Removing stale backup {}", backup.display());
        remove_tree(backup)?;
    }
    fs::rename(&paths.install_dir, backup).map_err(|e| {
        Error::IoError(format!(
            "Failed to move {} to {}: {}",
            paths.install_dir.display(),
            backup.display(),
            e
        ))
    })?;

    ledger
        .remove(recipe.name())?
        .ok_or_else(|| Error::NotFound(format!("{} is not in the ledger", recipe.name())))
}

/// Put a saved install back in place, relinked and registered
pub(crate) fn restore_old_install(
    recipe: &dyn Recipe,
    ledger: &mut Ledger,
    saved: SavedInstall,
) -> Result<()> {
    let paths = recipe.paths();

    remove_tree(&paths.install_dir)?;
    fs::rename(&saved.backup, &paths.install_dir).map_err(|e| {
        Error::IoError(format!(
            "Failed to move {} back to {}: {}",
            saved.backup.display(),
            paths.install_dir.display(),
            e
        ))
    })?;
    LinkFarm::new(&paths.link_dir).link(&paths.install_dir)?;
    ledger.restore(recipe.name(), saved.entry)?;

    info!("Restored previous install of {}", recipe.name());
    Ok(())
}
