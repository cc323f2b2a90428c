// src/lib.rs

//! Pantry: a source-based package manager
//!
//! Programs are described by recipes, built from source into their own
//! directory under the prefix, and exposed through a shared symlink farm.
//! An install ledger records what is installed.
//!
//! # Architecture
//!
//! - Recipes: TOML build specifications indexed into a [`recipe::Registry`]
//! - Attempts: build, link and verify under a guard that rolls back on failure
//! - Ledger: YAML record of installed programs, rewritten atomically
//! - Farm: per-file symlinks from the link root into each install directory
//! - Tasks: install, remove, update and the read-only queries

pub mod config;
mod error;
pub mod filesystem;
pub mod ledger;
pub mod orchestrator;
pub mod recipe;
pub mod search;
pub mod shell;
pub mod task;

pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerEntry};
pub use orchestrator::{Request, execute, plan, run_tasks};
pub use recipe::{Recipe, RecipePaths, Registry, Repository};
pub use task::{Context, Report, Task};
