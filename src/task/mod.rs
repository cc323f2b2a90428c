// src/task/mod.rs

//! Tasks: one requested operation each
//!
//! A task is bound to at most one recipe at construction and run exactly
//! once against the shared [`Context`]. Install, remove and update mutate
//! the ledger and the symlink farm; the query tasks only read.
//!
//! Outcomes that are not failures (already installed, not installed, up to
//! date) come back as a [`Report`] rather than an error.

mod install;
mod query;
mod remove;
mod update;

pub use install::InstallTask;
pub use query::{DisplayTask, ListAvailable, ListInstalled, SearchTask};
pub use remove::RemoveTask;
pub use update::UpdateTask;

use crate::config::Config;
use crate::error::Result;
use crate::ledger::{Ledger, LedgerEntry};
use crate::recipe::Registry;
use std::fmt;
use tracing::debug;

/// Process-wide state shared by every task
///
/// Built once at startup. The ledger inside is the only live copy; tasks
/// borrow it mutably for the duration of their run.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub ledger: Ledger,
    pub registry: Registry,
}

impl Context {
    pub fn new(config: Config, ledger: Ledger, registry: Registry) -> Self {
        Self {
            config,
            ledger,
            registry,
        }
    }

    /// Create configured directories, open the ledger and index recipes
    pub fn init(config: Config) -> Result<Self> {
        config.ensure_dirs()?;
        let ledger = Ledger::open(&config.ledger_path())?;
        let registry = Registry::from_config(&config)?;
        debug!(
            "Context ready: {} recipes, {} installed",
            registry.len(),
            ledger.len()
        );
        Ok(Self::new(config, ledger, registry))
    }
}

/// What a task did
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Installed { name: String, hash: String },
    AlreadyInstalled { name: String, entry: LedgerEntry },
    Removed { name: String },
    NotInstalled { name: String },
    Updated { name: String, from: String, to: String },
    UpToDate { name: String, hash: String },
    /// Rendered listing or info block
    Listing(String),
    /// Query words that matched
    Matches(Vec<String>),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed { name, hash } => write!(f, "Installed: {} ({})", name, hash),
            Self::AlreadyInstalled { name, entry } => write!(
                f,
                "Installed: {}\n  Built On: {}\n  Hash: {}",
                name,
                entry.date_display(),
                entry.hash
            ),
            Self::Removed { name } => write!(f, "Removed: {}", name),
            Self::NotInstalled { name } => write!(f, "Not Installed: {}", name),
            Self::Updated { name, from, to } => {
                write!(f, "Updated: {} ({} -> {})", name, from, to)
            }
            Self::UpToDate { name, hash } => write!(f, "Up To Date: {} ({})", name, hash),
            Self::Listing(text) => f.write_str(text),
            Self::Matches(words) => f.write_str(&words.join("\n")),
        }
    }
}

pub trait Task: fmt::Debug {
    fn run(&self, ctx: &mut Context) -> Result<Report>;
}
