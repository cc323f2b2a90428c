// src/recipe/bundled.rs

//! Recipes compiled into the binary
//!
//! They are registered before any recipe directory, so a user recipe with
//! the same name replaces the bundled one.

use crate::config::Config;
use crate::recipe::parser::parse_recipe;
use crate::recipe::{Formula, Registry};
use std::sync::Arc;
use tracing::{debug, warn};

/// `(file name, contents)` of every shipped recipe
pub const BUNDLED: &[(&str, &str)] = &[
    ("ag.toml", include_str!("../../recipes/ag.toml")),
    ("libjsoncpp.toml", include_str!("../../recipes/libjsoncpp.toml")),
    ("vim.toml", include_str!("../../recipes/vim.toml")),
];

/// Register the shipped recipes, returning how many loaded
pub fn register(registry: &mut Registry, config: &Config) -> usize {
    let mut count = 0;
    for (file, content) in BUNDLED {
        match parse_recipe(content).and_then(|recipe| Formula::new(recipe, config)) {
            Ok(formula) => {
                debug!("Registered bundled recipe {}", formula.recipe_file().package.name);
                registry.insert(Arc::new(formula));
                count += 1;
            }
            Err(e) => warn!("Skipping bundled recipe {}: {}", file, e),
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_every_bundled_recipe_loads() {
        let config = Config::with_base(Path::new("/base"));
        let mut registry = Registry::new();
        assert_eq!(register(&mut registry, &config), BUNDLED.len());
        assert_eq!(registry.names(), vec!["ag", "libjsoncpp", "vim"]);
    }
}
