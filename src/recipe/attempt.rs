// src/recipe/attempt.rs

//! Install attempt scope
//!
//! An [`AttemptScope`] brackets one try at building, linking and verifying a
//! recipe. Dropping the scope before [`AttemptScope::commit`] releases the
//! attempt: links made for the recipe are removed and its source and install
//! trees are deleted, leaving no trace of the attempt anywhere.
//!
//! ```text
//! NotStarted -> Building -> Linking -> Verifying -> Registered
//!                   \           \           \
//!                    +-----------+-----------+---> RolledBack
//! ```

use crate::error::Result;
use crate::filesystem::farm::LinkFarm;
use crate::recipe::Recipe;
use crate::recipe::repo::remove_tree;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Progress of an install attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Scope not yet entered
    NotStarted,
    /// Source fetched, running the recipe's build
    Building,
    /// Build finished, populating the symlink farm
    Linking,
    /// Linked, running the recipe's self-check
    Verifying,
    /// Verified and recorded in the ledger
    Registered,
    /// Attempt abandoned and cleaned up
    RolledBack,
}

impl AttemptState {
    /// True once links for the recipe may exist
    fn may_have_links(self) -> bool {
        matches!(self, Self::Linking | Self::Verifying)
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Building => "building",
            Self::Linking => "linking",
            Self::Verifying => "verifying",
            Self::Registered => "registered",
            Self::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// Guard around one install attempt
pub struct AttemptScope<'a> {
    recipe: &'a dyn Recipe,
    state: AttemptState,
}

impl<'a> AttemptScope<'a> {
    /// Enter the scope and fetch the recipe's source
    ///
    /// A failed fetch is released like any other failure.
    pub fn enter(recipe: &'a dyn Recipe) -> Result<Self> {
        let mut scope = Self {
            recipe,
            state: AttemptState::NotStarted,
        };
        debug!("Entering install attempt for {}", recipe.name());
        scope.advance(AttemptState::Building);
        recipe.fetch()?;
        Ok(scope)
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Move to the next step
    pub fn advance(&mut self, state: AttemptState) {
        debug!("{}: {} -> {}", self.recipe.name(), self.state, state);
        self.state = state;
    }

    /// Mark the attempt successful
    ///
    /// Build products are discarded from the source tree, which stays cached
    /// for later hash queries. A failed clean is logged, not raised: the
    /// program is already installed and registered.
    pub fn commit(mut self) {
        self.advance(AttemptState::Registered);
        if let Err(e) = self.recipe.clean() {
            warn!("Failed to clean source of {}: {}", self.recipe.name(), e);
        }
    }

    /// Undo everything the attempt left behind
    fn release(&mut self) -> Result<()> {
        let paths = self.recipe.paths();
        info!(
            "Rolling back {} (failed while {})",
            self.recipe.name(),
            self.state
        );

        if self.state.may_have_links() {
            LinkFarm::new(&paths.link_dir).unlink(&paths.install_dir)?;
        }
        remove_tree(&paths.source_dir)?;
        remove_tree(&paths.install_dir)?;
        self.advance(AttemptState::RolledBack);
        Ok(())
    }
}

impl Drop for AttemptScope<'_> {
    fn drop(&mut self) {
        if self.state == AttemptState::Registered {
            return;
        }
        if let Err(e) = self.release() {
            error!("Cleanup of {} failed: {}", self.recipe.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::recipe::RecipePaths;
    use crate::recipe::repo::{Dummy, Repository};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct Stub {
        paths: RecipePaths,
    }

    impl Stub {
        fn new(base: &Path) -> Self {
            Self {
                paths: RecipePaths {
                    install_dir: base.join("builds/stub"),
                    source_dir: base.join("src/stub"),
                    link_dir: base.join("links"),
                },
            }
        }
    }

    impl Recipe for Stub {
        fn name(&self) -> &str {
            "stub"
        }
        fn description(&self) -> &str {
            ""
        }
        fn homepage(&self) -> &str {
            ""
        }
        fn source(&self) -> &str {
            ""
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
        fn build(&self) -> crate::Result<()> {
            fs::create_dir_all(self.paths.install_dir.join("bin"))?;
            fs::write(self.paths.install_dir.join("bin/stub"), b"stub")?;
            Ok(())
        }
        fn verify(&self) -> crate::Result<()> {
            Err(Error::VerificationError("stub".to_string()))
        }
    }

    #[test]
    fn test_drop_rolls_back_links_and_dirs() {
        let temp = TempDir::new().unwrap();
        let recipe = Stub::new(temp.path());
        let paths = recipe.paths().clone();
        fs::create_dir_all(&paths.link_dir).unwrap();

        {
            let mut scope = AttemptScope::enter(&recipe).unwrap();
            assert_eq!(scope.state(), AttemptState::Building);
            assert!(paths.source_dir.is_dir());

            recipe.build().unwrap();
            scope.advance(AttemptState::Linking);
            LinkFarm::new(&paths.link_dir).link(&paths.install_dir).unwrap();
            scope.advance(AttemptState::Verifying);
            assert!(recipe.verify().is_err());
        }

        assert!(!paths.install_dir.exists());
        assert!(!paths.source_dir.exists());
        assert!(paths.link_dir.join("bin/stub").symlink_metadata().is_err());
        assert!(!paths.link_dir.join("bin").exists());
    }

    #[test]
    fn test_commit_keeps_install() {
        let temp = TempDir::new().unwrap();
        let recipe = Stub::new(temp.path());
        let paths = recipe.paths().clone();

        let mut scope = AttemptScope::enter(&recipe).unwrap();
        recipe.build().unwrap();
        scope.advance(AttemptState::Linking);
        LinkFarm::new(&paths.link_dir).link(&paths.install_dir).unwrap();
        scope.advance(AttemptState::Verifying);
        scope.commit();

        assert!(paths.install_dir.join("bin/stub").exists());
        assert!(paths.link_dir.join("bin/stub").exists());
        // Dummy's clean drops the source tree
        assert!(!paths.source_dir.exists());
    }

    #[test]
    fn test_rollback_during_build_skips_farm() {
        let temp = TempDir::new().unwrap();
        let recipe = Stub::new(temp.path());
        let paths = recipe.paths().clone();

        // A file of another program at the same mirrored path must survive
        fs::create_dir_all(paths.link_dir.join("bin")).unwrap();
        fs::write(paths.link_dir.join("bin/stub"), b"other").unwrap();

        {
            let _scope = AttemptScope::enter(&recipe).unwrap();
            recipe.build().unwrap();
        }

        assert!(!paths.install_dir.exists());
        assert_eq!(fs::read(paths.link_dir.join("bin/stub")).unwrap(), b"other");
    }
}
