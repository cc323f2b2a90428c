// src/orchestrator.rs

//! Turn a user request into tasks and run them in order

use crate::error::Result;
use crate::task::{
    Context, DisplayTask, InstallTask, ListAvailable, ListInstalled, RemoveTask, Report,
    SearchTask, Task, UpdateTask,
};
use tracing::{debug, error};

/// One invocation's worth of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Install(Vec<String>),
    Remove(Vec<String>),
    /// Update the named programs, or every installed program when empty
    Update(Vec<String>),
    ListInstalled,
    ListAvailable,
    Display(Vec<String>),
    Search(Vec<String>),
}

/// Resolve every recipe a request names and wrap each in a task
///
/// Fails with [`crate::Error::NotFound`] on the first unknown name, before
/// any task has run.
pub fn plan(request: &Request, ctx: &Context) -> Result<Vec<Box<dyn Task>>> {
    let registry = &ctx.registry;
    let mut tasks: Vec<Box<dyn Task>> = Vec::new();

    match request {
        Request::Install(names) => {
            for name in names {
                tasks.push(Box::new(InstallTask::new(registry.get(name)?)));
            }
        }
        Request::Remove(names) => {
            for name in names {
                tasks.push(Box::new(RemoveTask::new(registry.get(name)?)));
            }
        }
        Request::Update(names) => {
            let names = if names.is_empty() {
                ctx.ledger.names()
            } else {
                names.clone()
            };
            for name in &names {
                tasks.push(Box::new(UpdateTask::new(registry.get(name)?)));
            }
        }
        Request::ListInstalled => tasks.push(Box::new(ListInstalled)),
        Request::ListAvailable => tasks.push(Box::new(ListAvailable)),
        Request::Display(names) => {
            for name in names {
                tasks.push(Box::new(DisplayTask::new(registry.get(name)?)));
            }
        }
        Request::Search(words) => {
            tasks.push(Box::new(SearchTask::new(
                registry.names_and_desc(),
                words.clone(),
            )));
        }
    }

    debug!("Planned {} task(s) for {:?}", tasks.len(), request);
    Ok(tasks)
}

/// Run tasks sequentially, handing each report to `on_report`
///
/// Stops at the first failing task; earlier tasks' effects stand.
pub fn run_tasks(
    tasks: &[Box<dyn Task>],
    ctx: &mut Context,
    mut on_report: impl FnMut(&Report),
) -> Result<Vec<Report>> {
    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        debug!("Running {:?}", task);
        match task.run(ctx) {
            Ok(report) => {
                on_report(&report);
                reports.push(report);
            }
            Err(e) if e.is_attempt_failure() => {
                error!("{:?} failed and was rolled back: {}", task, e);
                return Err(e);
            }
            Err(e) => {
                error!("{:?} failed: {}", task, e);
                return Err(e);
            }
        }
    }
    Ok(reports)
}

/// Plan and run a request
pub fn execute(request: &Request, ctx: &mut Context) -> Result<Vec<Report>> {
    let tasks = plan(request, ctx)?;
    run_tasks(&tasks, ctx, |_| {})
}
