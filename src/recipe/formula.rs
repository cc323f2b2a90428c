// src/recipe/formula.rs

//! Recipes backed by TOML recipe files

use crate::config::Config;
use crate::error::{Error, Result};
use crate::recipe::format::{RecipeFile, Substitutions};
use crate::recipe::parser::{parse_recipe_file, validate_recipe};
use crate::recipe::repo::{self, Repository};
use crate::recipe::{Recipe, RecipePaths};
use crate::shell::{Output, Shell};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A [`Recipe`] described by a [`RecipeFile`]
#[derive(Debug)]
pub struct Formula {
    file: RecipeFile,
    paths: RecipePaths,
    repo_label: String,
    repos: BTreeMap<String, Box<dyn Repository>>,
    timeout: Duration,
}

impl Formula {
    /// Bind a parsed recipe file to the configured directories
    pub fn new(file: RecipeFile, config: &Config) -> Result<Self> {
        for warning in validate_recipe(&file)? {
            warn!("Recipe {}: {}", file.package.name, warning);
        }

        let repo_label = file
            .select_repo(&config.defaults.repo)
            .ok_or_else(|| {
                Error::ParseError(format!("Recipe {} defines no repos", file.package.name))
            })?
            .to_string();

        let timeout = config.command_timeout();
        let repos = file
            .repos
            .iter()
            .map(|(label, spec)| (label.clone(), repo::from_spec(spec, timeout)))
            .collect();

        Ok(Self {
            paths: RecipePaths::for_name(config, &file.package.name),
            file,
            repo_label,
            repos,
            timeout,
        })
    }

    /// Load a recipe file from disk
    pub fn load(path: &Path, config: &Config) -> Result<Self> {
        let file = parse_recipe_file(path)?;
        Self::new(file, config)
    }

    pub fn recipe_file(&self) -> &RecipeFile {
        &self.file
    }

    fn substitute(&self, template: &str) -> String {
        let prefix = self.paths.install_dir.to_string_lossy();
        let link = self.paths.link_dir.to_string_lossy();
        let source = self.paths.source_dir.to_string_lossy();
        let vars = Substitutions {
            name: &self.file.package.name,
            prefix: &prefix,
            link: &link,
            source: &source,
        };
        self.file.substitute(template, &vars)
    }

    fn run_verify_commands(&self) -> Result<Vec<Output>> {
        let shell = Shell::new()
            .in_dir(&self.paths.link_dir)
            .with_timeout(self.timeout);
        self.file
            .verify
            .commands
            .iter()
            .map(|cmd| shell.run(&self.substitute(cmd)))
            .collect()
    }
}

impl Recipe for Formula {
    fn name(&self) -> &str {
        &self.file.package.name
    }

    fn description(&self) -> &str {
        self.file.description()
    }

    fn homepage(&self) -> &str {
        self.file.package.homepage.as_deref().unwrap_or("")
    }

    fn source(&self) -> &str {
        self.file
            .package
            .source
            .as_deref()
            .or_else(|| self.file.repos.get(&self.repo_label).and_then(|s| s.url()))
            .unwrap_or("")
    }

    fn paths(&self) -> &RecipePaths {
        &self.paths
    }

    fn repo_label(&self) -> &str {
        &self.repo_label
    }

    fn repo(&self) -> &dyn Repository {
        // new() only stores a label that exists in `repos`
        match self.repos.get(&self.repo_label) {
            Some(repo) => repo.as_ref(),
            None => &repo::Dummy,
        }
    }

    fn repos(&self) -> Vec<(&str, &dyn Repository)> {
        self.repos
            .iter()
            .map(|(label, repo)| (label.as_str(), repo.as_ref()))
            .collect()
    }

    fn build(&self) -> Result<()> {
        info!("Building {} from {}", self.name(), self.paths.source_dir.display());
        fs::create_dir_all(&self.paths.install_dir)?;

        let shell = Shell::new()
            .in_dir(&self.paths.source_dir)
            .with_env(self.file.build.environment.clone())
            .with_timeout(self.timeout);

        for cmd in &self.file.build.commands {
            shell.run(&self.substitute(cmd))?;
        }
        Ok(())
    }

    fn verify(&self) -> Result<()> {
        if self.file.verify.commands.is_empty() {
            debug!("No verify commands for {}", self.name());
            return Ok(());
        }

        let outputs = self
            .run_verify_commands()
            .map_err(|e| Error::VerificationError(format!("{}: {}", self.name(), e)))?;

        if let Some(expected) = &self.file.verify.expect
            && !outputs.iter().any(|out| out.contains(expected))
        {
            return Err(Error::VerificationError(format!(
                "{}: output did not contain \"{}\"",
                self.name(),
                expected
            )));
        }
        Ok(())
    }
}
