// src/recipe/format.rs

//! Recipe file format definitions
//!
//! Recipes are TOML files that describe where a program's source lives and
//! which commands build and verify it. Commands may reference the recipe's
//! directories through `%(name)s` style variables.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A complete recipe file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeFile {
    /// Program metadata
    pub package: PackageSection,

    /// Source repositories keyed by label (`stable`, `unstable`, ...)
    pub repos: BTreeMap<String, RepoSpec>,

    /// Build instructions
    #[serde(default)]
    pub build: BuildSection,

    /// Post-link self-check
    #[serde(default)]
    pub verify: VerifySection,

    /// Variables for substitution
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Values for the built-in substitution variables
#[derive(Debug, Clone, Copy)]
pub struct Substitutions<'a> {
    pub name: &'a str,
    pub prefix: &'a str,
    pub link: &'a str,
    pub source: &'a str,
}

impl RecipeFile {
    /// Substitute variables in a command template
    ///
    /// Replaces `%(name)s` patterns with, in order:
    /// 1. Built-in variables (`name`, `prefix`, `link`, `source`)
    /// 2. Custom variables from the `[variables]` section
    pub fn substitute(&self, template: &str, vars: &Substitutions<'_>) -> String {
        let mut result = template.to_string();

        result = result.replace("%(name)s", vars.name);
        result = result.replace("%(prefix)s", vars.prefix);
        result = result.replace("%(link)s", vars.link);
        result = result.replace("%(source)s", vars.source);

        for (key, value) in &self.variables {
            result = result.replace(&format!("%({})s", key), value);
        }

        result
    }

    /// Description, or an empty string
    pub fn description(&self) -> &str {
        self.package.description.as_deref().unwrap_or("")
    }

    /// Pick the repository label to build from
    ///
    /// Prefers `preferred`, then `stable`, then the first label in order.
    pub fn select_repo<'a>(&'a self, preferred: &str) -> Option<&'a str> {
        if let Some((label, _)) = self.repos.get_key_value(preferred) {
            return Some(label.as_str());
        }
        if let Some((label, _)) = self.repos.get_key_value("stable") {
            return Some(label.as_str());
        }
        self.repos.keys().next().map(|s| s.as_str())
    }
}

/// Program metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    /// Program name, also the install directory name
    pub name: String,

    /// One-line description shown by `available` and `search`
    #[serde(default)]
    pub description: Option<String>,

    /// Homepage URL
    #[serde(default)]
    pub homepage: Option<String>,

    /// Canonical source URL (defaults to the active repo's URL)
    #[serde(default)]
    pub source: Option<String>,
}

/// Where a repository's source comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RepoSpec {
    /// Git repository pinned to a tag or tracking a branch
    Git {
        url: String,
        #[serde(default)]
        tag: Option<String>,
        #[serde(default)]
        branch: Option<String>,
    },
    /// Mercurial repository pinned to a tag or tracking a branch
    Hg {
        url: String,
        #[serde(default)]
        tag: Option<String>,
        #[serde(default)]
        branch: Option<String>,
    },
    /// Tarball fetched over http(s) or copied from a local path
    Archive {
        url: String,
        /// `sha256:<hex>`
        checksum: String,
    },
    /// Empty source tree, for recipes whose build needs no checkout
    Dummy,
}

impl RepoSpec {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Git { url, .. } | Self::Hg { url, .. } | Self::Archive { url, .. } => {
                Some(url)
            }
            Self::Dummy => None,
        }
    }
}

/// Build instructions section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSection {
    /// Commands run in order inside the source directory
    ///
    /// Install into `%(prefix)s`.
    #[serde(default)]
    pub commands: Vec<String>,

    /// Environment variables to set during build
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

/// Self-check run after the program is linked
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifySection {
    /// Commands run in order inside the link directory
    #[serde(default)]
    pub commands: Vec<String>,

    /// Text that must appear in the combined output of the commands
    #[serde(default)]
    pub expect: Option<String>,
}
