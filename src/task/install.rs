// src/task/install.rs

//! Install a recipe
//!
//! Build, link and verify run inside an [`AttemptScope`]; any failure rolls
//! the attempt back before the error reaches the caller. The ledger entry is
//! written last, so it exists only for complete installs.

use crate::error::Result;
use crate::filesystem::LinkFarm;
use crate::ledger::Ledger;
use crate::recipe::repo::remove_tree;
use crate::recipe::{AttemptScope, AttemptState, Recipe};
use crate::task::{Context, Report, Task};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct InstallTask {
    recipe: Arc<dyn Recipe>,
}

impl InstallTask {
    pub fn new(recipe: Arc<dyn Recipe>) -> Self {
        Self { recipe }
    }
}

impl Task for InstallTask {
    fn run(&self, ctx: &mut Context) -> Result<Report> {
        let recipe = self.recipe.as_ref();
        debug!("Installing: {}", recipe.name());

        if let Some(entry) = ctx.ledger.get(recipe.name()) {
            return Ok(Report::AlreadyInstalled {
                name: recipe.name().to_string(),
                entry: entry.clone(),
            });
        }

        purge_aborted_attempt(recipe)?;
        install_recipe(recipe, &mut ctx.ledger)?;

        let hash = ctx
            .ledger
            .get(recipe.name())
            .map(|entry| entry.hash.clone())
            .unwrap_or_default();
        Ok(Report::Installed {
            name: recipe.name().to_string(),
            hash,
        })
    }
}

/// Build, link, verify and register `recipe`
///
/// The caller must have checked that `recipe` is not in the ledger.
pub(crate) fn install_recipe(recipe: &dyn Recipe, ledger: &mut Ledger) -> Result<()> {
    let paths = recipe.paths();
    let mut scope = AttemptScope::enter(recipe)?;

    recipe.build()?;

    scope.advance(AttemptState::Linking);
    LinkFarm::new(&paths.link_dir).link(&paths.install_dir)?;

    scope.advance(AttemptState::Verifying);
    recipe.verify()?;

    ledger.add(recipe)?;
    scope.commit();

    info!("Installed {}", recipe.name());
    Ok(())
}

/// Clear what a killed process left behind
///
/// With no ledger entry, an install tree can only come from an attempt
/// that never finished. Its links are removed and both trees purged. A
/// lone source tree is kept; the repository revalidates it on fetch.
fn purge_aborted_attempt(recipe: &dyn Recipe) -> Result<()> {
    let paths = recipe.paths();
    if !paths.install_dir.exists() {
        return Ok(());
    }

    warn!(
        "Purging leftovers of an aborted install of {} at {}",
        recipe.name(),
        paths.install_dir.display()
    );
    LinkFarm::new(&paths.link_dir).unlink(&paths.install_dir)?;
    remove_tree(&paths.install_dir)?;
    remove_tree(&paths.source_dir)?;
    Ok(())
}
