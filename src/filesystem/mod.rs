// src/filesystem/mod.rs

//! Filesystem operations for pantry
//!
//! This module provides:
//! - The symlink farm that exposes installed programs through one link tree
//! - Atomic file replacement for durable state such as the install ledger

pub mod atomic;
pub mod farm;

pub use atomic::atomic_write_file;
pub use farm::{link, unlink, LinkFarm};
