// src/task/remove.rs

//! Remove an installed recipe

use crate::error::Result;
use crate::filesystem::LinkFarm;
use crate::recipe::Recipe;
use crate::recipe::repo::remove_tree;
use crate::task::{Context, Report, Task};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RemoveTask {
    recipe: Arc<dyn Recipe>,
}

impl RemoveTask {
    pub fn new(recipe: Arc<dyn Recipe>) -> Self {
        Self { recipe }
    }
}

impl Task for RemoveTask {
    /// Unlink, delete the install tree, then forget the entry
    ///
    /// Each step is idempotent, so a remove interrupted part way can simply
    /// be run again.
    fn run(&self, ctx: &mut Context) -> Result<Report> {
        let recipe = self.recipe.as_ref();
        let name = recipe.name().to_string();
        debug!("Removing: {}", name);

        if !ctx.ledger.contains(&name) {
            info!("Not Installed: {}", name);
            return Ok(Report::NotInstalled { name });
        }

        let paths = recipe.paths();
        LinkFarm::new(&paths.link_dir).unlink(&paths.install_dir)?;
        remove_tree(&paths.install_dir)?;
        ctx.ledger.remove(&name)?;

        info!("Removed {}", name);
        Ok(Report::Removed { name })
    }
}
