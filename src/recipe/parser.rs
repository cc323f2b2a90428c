// src/recipe/parser.rs

//! Recipe file parsing

use crate::error::{Error, Result};
use crate::recipe::format::{RecipeFile, RepoSpec};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

const BUILTIN_VARS: [&str; 4] = ["name", "prefix", "link", "source"];

static VARIABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\((\w+)\)s").expect("static regex"));

pub fn parse_recipe(content: &str) -> Result<RecipeFile> {
    toml::from_str(content).map_err(|e| Error::ParseError(e.to_string()))
}

/// Read and parse a recipe file; errors name the offending file
pub fn parse_recipe_file(path: &Path) -> Result<RecipeFile> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Cannot read {}: {}", path.display(), e)))?;
    parse_recipe(&text).map_err(|e| match e {
        Error::ParseError(msg) => Error::ParseError(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Validate a recipe for completeness and correctness
///
/// Hard problems are errors; anything that still yields a usable recipe is
/// returned as a warning.
pub fn validate_recipe(recipe: &RecipeFile) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    let name = &recipe.package.name;
    if name.is_empty() {
        return Err(Error::ParseError("Recipe name cannot be empty".to_string()));
    }
    if name.contains('/') || name == "." || name == ".." {
        return Err(Error::ParseError(format!("Invalid recipe name: {}", name)));
    }

    if recipe.repos.is_empty() {
        return Err(Error::ParseError(format!("Recipe {} defines no repos", name)));
    }

    for (label, spec) in &recipe.repos {
        match spec {
            RepoSpec::Git {
                tag: Some(_),
                branch: Some(_),
                ..
            }
            | RepoSpec::Hg {
                tag: Some(_),
                branch: Some(_),
                ..
            } => {
                return Err(Error::ParseError(format!(
                    "Repo {} of {}: tag and branch are mutually exclusive",
                    label, name
                )));
            }
            RepoSpec::Archive { checksum, .. } => {
                let valid = checksum
                    .strip_prefix("sha256:")
                    .is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()));
                if !valid {
                    return Err(Error::ParseError(format!(
                        "Invalid checksum format: {}. Expected sha256:<64 hex digits>",
                        checksum
                    )));
                }
            }
            _ => {}
        }
    }

    if recipe.package.description.is_none() {
        warnings.push("Missing description".to_string());
    }
    if recipe.build.commands.is_empty() {
        warnings.push("No build commands specified".to_string());
    }
    if recipe.verify.commands.is_empty() {
        warnings.push("No verify commands specified".to_string());
    }

    let commands = recipe.build.commands.iter().chain(&recipe.verify.commands);
    for command in commands {
        for cap in VARIABLE_PATTERN.captures_iter(command) {
            let var = &cap[1];
            if !BUILTIN_VARS.contains(&var) && !recipe.variables.contains_key(var) {
                warnings.push(format!("Undefined variable %({})s in: {}", var, command));
            }
        }
    }

    Ok(warnings)
}
