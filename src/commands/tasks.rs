// src/commands/tasks.rs
//! Task-backed commands: install, remove, update and the queries

use anyhow::{Context as _, Result};
use pantry::{Config, Context, Request, plan, run_tasks};
use tracing::debug;

/// Plan a request, then run its tasks in order, printing each report
///
/// Every named recipe is resolved before anything runs. The first failing
/// task stops the rest.
pub fn cmd_request(config: Config, request: Request) -> Result<()> {
    let mut ctx = Context::init(config).context("Failed to initialize pantry")?;

    let tasks = plan(&request, &ctx)?;
    if tasks.is_empty() {
        debug!("Nothing to do for {:?}", request);
        return Ok(());
    }

    run_tasks(&tasks, &mut ctx, |report| println!("{}", report))?;
    Ok(())
}
