// src/recipe/registry.rs

//! Registry of known recipes
//!
//! Recipes are indexed from directories of `*.toml` files, after the
//! recipes bundled with pantry. When two recipes share a name, the one
//! registered last wins, so user directories indexed after shared ones can
//! override them.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::recipe::{Formula, Recipe, bundled};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct Registry {
    recipes: BTreeMap<String, Arc<dyn Recipe>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the bundled recipes, then index every configured directory
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        if config.recipes.bundled {
            bundled::register(&mut registry, config);
        }
        for dir in config.recipe_dirs() {
            registry.index(&dir, config)?;
        }
        Ok(registry)
    }

    /// Register a recipe, replacing any with the same name
    pub fn insert(&mut self, recipe: Arc<dyn Recipe>) {
        let name = recipe.name().to_string();
        if self.recipes.insert(name.clone(), recipe).is_some() {
            debug!("Recipe {} overridden", name);
        }
    }

    /// Load every `*.toml` recipe in `dir`
    ///
    /// Files that fail to parse are logged and skipped. A missing directory
    /// indexes nothing. Returns the number of recipes registered.
    pub fn index(&mut self, dir: &Path, config: &Config) -> Result<usize> {
        if !dir.is_dir() {
            debug!("Recipe directory {} does not exist", dir.display());
            return Ok(0);
        }

        let pattern = dir.join("*.toml");
        let pattern = pattern.to_string_lossy();
        let mut paths: Vec<_> = glob::glob(&pattern)
            .map_err(|e| Error::ParseError(format!("Bad recipe pattern {}: {}", pattern, e)))?
            .filter_map(|entry| entry.ok())
            .collect();
        paths.sort();

        let mut count = 0;
        for path in paths {
            match Formula::load(&path, config) {
                Ok(formula) => {
                    debug!("Indexed recipe {} from {}", formula.name(), path.display());
                    self.insert(Arc::new(formula));
                    count += 1;
                }
                Err(e) => warn!("Skipping recipe {}: {}", path.display(), e),
            }
        }
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Recipe>> {
        self.recipes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("No recipe named {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    /// Recipe names in order
    pub fn names(&self) -> Vec<String> {
        self.recipes.keys().cloned().collect()
    }

    /// `name: description` for every recipe, in order
    pub fn names_and_desc(&self) -> Vec<String> {
        self.recipes
            .values()
            .map(|r| format!("{}: {}", r.name(), r.description()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
