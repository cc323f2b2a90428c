// src/task/query.rs

//! Read-only tasks: listings, recipe info and search

use crate::error::Result;
use crate::recipe::Recipe;
use crate::search::matching_words;
use crate::task::{Context, Report, Task};
use std::sync::Arc;
use tracing::debug;

/// Installed programs, in ledger order
#[derive(Debug, Clone, Copy, Default)]
pub struct ListInstalled;

impl Task for ListInstalled {
    fn run(&self, ctx: &mut Context) -> Result<Report> {
        debug!("List Installed Programs");

        let mut msg = String::from("Installed Programs:");
        msg.push_str("\nProgram      | Date                | Hash or Version");
        for (name, entry) in &ctx.ledger {
            msg.push_str(&format!(
                "\n  {:10} | {} | {}",
                name,
                entry.date_display(),
                entry.hash
            ));
        }
        Ok(Report::Listing(msg))
    }
}

/// Every known recipe with its description
#[derive(Debug, Clone, Copy, Default)]
pub struct ListAvailable;

impl Task for ListAvailable {
    fn run(&self, ctx: &mut Context) -> Result<Report> {
        debug!("List Available Recipes");

        let mut msg = String::from("Available Recipes:");
        for line in ctx.registry.names_and_desc() {
            msg.push_str("\n  ");
            msg.push_str(&line);
        }
        Ok(Report::Listing(msg))
    }
}

/// Detailed information about one recipe
#[derive(Debug, Clone)]
pub struct DisplayTask {
    recipe: Arc<dyn Recipe>,
}

impl DisplayTask {
    pub fn new(recipe: Arc<dyn Recipe>) -> Self {
        Self { recipe }
    }
}

impl Task for DisplayTask {
    fn run(&self, _ctx: &mut Context) -> Result<Report> {
        debug!("Displaying Info: {}", self.recipe.name());
        Ok(Report::Listing(self.recipe.info()))
    }
}

/// Which query words occur in a haystack of `name: description` entries
#[derive(Debug, Clone)]
pub struct SearchTask {
    haystack: Vec<String>,
    words: Vec<String>,
}

impl SearchTask {
    pub fn new(haystack: Vec<String>, words: Vec<String>) -> Self {
        Self { haystack, words }
    }
}

impl Task for SearchTask {
    fn run(&self, _ctx: &mut Context) -> Result<Report> {
        debug!("Searching for: {:?}", self.words);
        Ok(Report::Matches(matching_words(&self.haystack, &self.words)))
    }
}
