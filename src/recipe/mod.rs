// src/recipe/mod.rs

//! Recipe system for building programs from source
//!
//! A recipe names a program, says where its source lives and which commands
//! build and verify it. Each program is built into its own directory under
//! the prefix and then exposed through the shared link directory.
//!
//! # Culinary Terminology
//!
//! - **Recipe**: the build specification for one program
//! - **Pantry**: the prefix where every built program is stored
//! - **Registry**: the shelf of known recipes, indexed from recipe directories
//! - **Attempt**: one try at building, linking and verifying a recipe
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! name = "ag"
//! description = "Grep like tool optimized for speed"
//!
//! [repos.stable]
//! kind = "git"
//! url = "https://github.com/ggreer/the_silver_searcher"
//! tag = "0.30.0"
//!
//! [build]
//! commands = ["./build.sh --prefix %(prefix)s", "make install"]
//!
//! [verify]
//! commands = ["%(link)s/bin/ag --version"]
//! expect = "ag version"
//! ```

pub mod archive;
pub mod attempt;
pub mod bundled;
mod format;
mod formula;
pub mod parser;
pub mod registry;
pub mod repo;

pub use attempt::{AttemptScope, AttemptState};
pub use format::{BuildSection, PackageSection, RecipeFile, RepoSpec, Substitutions, VerifySection};
pub use formula::Formula;
pub use parser::{parse_recipe, parse_recipe_file, validate_recipe};
pub use registry::Registry;
pub use repo::Repository;

use crate::config::Config;
use crate::error::Result;
use std::fmt;
use std::path::PathBuf;

/// Directories a recipe works in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipePaths {
    /// Isolated install tree, `<prefix>/<name>`
    pub install_dir: PathBuf,
    /// Source checkout, `<source>/<name>`
    pub source_dir: PathBuf,
    /// Shared symlink farm root
    pub link_dir: PathBuf,
}

impl RecipePaths {
    pub fn for_name(config: &Config, name: &str) -> Self {
        Self {
            install_dir: config.paths.prefix.join(name),
            source_dir: config.paths.source.join(name),
            link_dir: config.paths.link.clone(),
        }
    }

    /// Where an update parks the previous install
    pub fn backup_dir(&self) -> PathBuf {
        let mut name = self.install_dir.clone().into_os_string();
        name.push("_bak");
        PathBuf::from(name)
    }
}

/// A buildable program
///
/// Implementations are stateless templates: everything an attempt produces
/// lives under [`RecipePaths::install_dir`] and [`RecipePaths::source_dir`].
pub trait Recipe: fmt::Debug {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn homepage(&self) -> &str;

    /// Canonical source location
    fn source(&self) -> &str;

    fn paths(&self) -> &RecipePaths;

    /// Label of the repository builds come from
    fn repo_label(&self) -> &str;

    /// The repository builds come from
    fn repo(&self) -> &dyn Repository;

    /// Every declared repository, by label
    fn repos(&self) -> Vec<(&str, &dyn Repository)>;

    /// Build and install into `install_dir`; runs inside the source tree
    fn build(&self) -> Result<()>;

    /// Self-check after linking
    fn verify(&self) -> Result<()>;

    /// Materialize the source tree
    fn fetch(&self) -> Result<()> {
        self.repo().fetch(&self.paths().source_dir)
    }

    /// Hash of the snapshot the active repository would build
    fn cur_hash(&self) -> Result<String> {
        self.repo().cur_hash(&self.paths().source_dir)
    }

    /// Discard build products from the source tree
    fn clean(&self) -> Result<()> {
        self.repo().clean(&self.paths().source_dir)
    }

    /// Multi-line information block for `display`
    fn info(&self) -> String {
        let mut lines = vec![
            format!("{}: {}", self.name(), self.description()),
            format!("  Homepage: {}", self.homepage()),
            format!("  Source: {}", self.source()),
            format!("  Current Repo: \"{}\"", self.repo_label()),
        ];
        for (label, repo) in self.repos() {
            lines.push(format!("  Repo \"{}\": {}", label, repo.describe()));
        }
        lines.join("\n")
    }
}
