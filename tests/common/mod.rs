// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use pantry::recipe::repo::Dummy;
use pantry::{Config, Context, Error, Ledger, Recipe, RecipePaths, Registry, Repository, Result};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Where a [`FakeRecipe`] should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Build,
    Verify,
}

/// In-memory recipe that writes a fixed set of files into its install dir
///
/// The hash, the files and an injected failure can all be changed after
/// the recipe has been registered.
#[derive(Debug)]
pub struct FakeRecipe {
    name: String,
    description: String,
    paths: RecipePaths,
    files: RefCell<Vec<(String, String)>>,
    hash: RefCell<String>,
    fail_at: Cell<Option<FailAt>>,
}

impl FakeRecipe {
    pub fn new(config: &Config, name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            paths: RecipePaths::for_name(config, name),
            files: RefCell::new(vec![
                (format!("bin/{}", name), format!("#!/bin/sh\necho {}\n", name)),
                (format!("share/{}/README", name), "v1".to_string()),
            ]),
            hash: RefCell::new("v1".to_string()),
            fail_at: Cell::new(None),
        }
    }

    pub fn set_hash(&self, hash: &str) {
        *self.hash.borrow_mut() = hash.to_string();
    }

    pub fn set_files(&self, files: &[(&str, &str)]) {
        *self.files.borrow_mut() = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect();
    }

    pub fn fail_at(&self, step: Option<FailAt>) {
        self.fail_at.set(step);
    }

    pub fn files(&self) -> Vec<(String, String)> {
        self.files.borrow().clone()
    }
}

impl Recipe for FakeRecipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn homepage(&self) -> &str {
        "https://example.com"
    }

    fn source(&self) -> &str {
        "https://example.com/src"
    }

    fn paths(&self) -> &RecipePaths {
        &self.paths
    }

    fn repo_label(&self) -> &str {
        "stable"
    }

    fn repo(&self) -> &dyn Repository {
        &Dummy
    }

    fn repos(&self) -> Vec<(&str, &dyn Repository)> {
        vec![("stable", &Dummy as &dyn Repository)]
    }

    fn cur_hash(&self) -> Result<String> {
        Ok(self.hash.borrow().clone())
    }

    fn build(&self) -> Result<()> {
        fs::write(self.paths.source_dir.join("build.log"), "building")?;

        for (i, (path, content)) in self.files.borrow().iter().enumerate() {
            // Fail after the first file so a partial install is left behind
            if i == 1 && self.fail_at.get() == Some(FailAt::Build) {
                return Err(Error::CommandError(format!("make: *** [{}] Error 1", path)));
            }
            let dest = self.paths.install_dir.join(path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(dest, content)?;
        }
        Ok(())
    }

    fn verify(&self) -> Result<()> {
        if self.fail_at.get() == Some(FailAt::Verify) {
            return Err(Error::VerificationError(format!("{}: self-check failed", self.name)));
        }
        for (path, _) in self.files.borrow().iter() {
            if !self.paths.link_dir.join(path).exists() {
                return Err(Error::VerificationError(format!("{} not linked", path)));
            }
        }
        Ok(())
    }
}

/// Create a context rooted in a fresh temp dir with an empty registry.
///
/// Returns (TempDir, Context) - keep the TempDir alive to prevent cleanup.
pub fn setup_context() -> (TempDir, Context) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::with_base(temp_dir.path());
    config.ensure_dirs().unwrap();

    let ledger = Ledger::open(&config.ledger_path()).unwrap();
    let ctx = Context::new(config, ledger, Registry::new());
    (temp_dir, ctx)
}

/// Register a fake recipe and hand back a handle to it
pub fn add_fake(ctx: &mut Context, name: &str, description: &str) -> Arc<FakeRecipe> {
    let recipe = Arc::new(FakeRecipe::new(&ctx.config, name, description));
    ctx.registry.insert(recipe.clone());
    recipe
}

/// The ledger as persisted on disk
pub fn reload_ledger(ctx: &Context) -> Ledger {
    Ledger::open(&ctx.config.ledger_path()).unwrap()
}

/// Every symlink under `link_dir` whose target lies in `install_dir`
pub fn links_into(link_dir: &Path, install_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(link_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path_is_symlink())
        .filter(|entry| {
            fs::read_link(entry.path())
                .map(|target| target.starts_with(install_dir))
                .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

/// Assert that every file of an installed recipe has a link resolving to it
pub fn assert_fully_linked(recipe: &FakeRecipe) {
    let paths = recipe.paths();
    for (path, content) in recipe.files() {
        let link = paths.link_dir.join(&path);
        let target = fs::read_link(&link)
            .unwrap_or_else(|e| panic!("{} is not a link: {}", link.display(), e));
        assert_eq!(target, paths.install_dir.join(&path));
        assert_eq!(fs::read_to_string(&link).unwrap(), content);
    }
}

/// Assert that nothing of `recipe` is left on disk or in the ledger
pub fn assert_no_trace(ctx: &Context, recipe: &FakeRecipe) {
    let paths = recipe.paths();
    assert!(ctx.ledger.get(recipe.name()).is_none());
    assert!(reload_ledger(ctx).get(recipe.name()).is_none());
    assert!(!paths.install_dir.exists(), "install dir left behind");
    assert!(!paths.source_dir.exists(), "source dir left behind");
    assert!(links_into(&paths.link_dir, &paths.install_dir).is_empty());
}
