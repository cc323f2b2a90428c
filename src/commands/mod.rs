// src/commands/mod.rs
//! Command handlers for the pantry CLI

mod config;
mod tasks;

pub use config::cmd_create_conf;
pub use tasks::cmd_request;
