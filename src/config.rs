// src/config.rs

//! User configuration
//!
//! Loaded from a TOML file (default `~/.pantry.toml`). Every section is
//! optional; missing keys fall back to the defaults below, which keep all
//! state under `~/.pantry`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default config file name inside the home directory
pub const DEFAULT_CONFIG_NAME: &str = ".pantry.toml";

/// Ledger file name inside the prefix
pub const LEDGER_FILE: &str = "installed.yaml";

/// Default shell command idle timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub log: LogConfig,
    pub command: CommandConfig,
    pub defaults: DefaultsConfig,
    pub update: UpdateConfig,
    pub recipes: RecipesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of per-program install directories
    pub prefix: PathBuf,
    /// Root of the shared symlink farm
    pub link: PathBuf,
    /// Root of per-program source checkouts
    pub source: PathBuf,
    /// User recipe directory
    pub recipes: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Seconds a running command may go without output before it is killed
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Repository label preferred when a recipe defines it
    pub repo: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Leave `<install_dir>_bak` on disk after a successful update
    pub keep_backup: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipesConfig {
    /// Register the recipes shipped with pantry before any directory
    pub bundled: bool,
    /// Directories indexed before `paths.recipes`
    pub extra_dirs: Vec<PathBuf>,
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            bundled: true,
            extra_dirs: Vec::new(),
        }
    }
}

fn pantry_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".pantry")
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = pantry_home();
        Self {
            prefix: home.join("builds"),
            link: home.join("links"),
            source: home.join("src"),
            recipes: home.join("recipes"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: pantry_home().join("main.log"),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            repo: "stable".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            log: LogConfig::default(),
            command: CommandConfig::default(),
            defaults: DefaultsConfig::default(),
            update: UpdateConfig::default(),
            recipes: RecipesConfig::default(),
        }
    }
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_CONFIG_NAME)
    }

    /// Config rooted entirely under `base`, used by tests and `--root` style setups
    pub fn with_base(base: &Path) -> Self {
        Self {
            paths: PathsConfig {
                prefix: base.join("builds"),
                link: base.join("links"),
                source: base.join("src"),
                recipes: base.join("recipes"),
            },
            log: LogConfig {
                file: base.join("main.log"),
            },
            ..Self::default()
        }
    }

    /// Load the config file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse a config from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Invalid config: {}", e)))?;
        config.expand_paths();
        Ok(config)
    }

    /// Write the effective config, overwriting any existing file
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn expand_paths(&mut self) {
        for path in [
            &mut self.paths.prefix,
            &mut self.paths.link,
            &mut self.paths.source,
            &mut self.paths.recipes,
            &mut self.log.file,
        ] {
            *path = expand_home(path);
        }
        for dir in &mut self.recipes.extra_dirs {
            *dir = expand_home(dir);
        }
    }

    /// Create every configured directory
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            &self.paths.prefix,
            &self.paths.link,
            &self.paths.source,
            &self.paths.recipes,
        ] {
            fs::create_dir_all(dir).map_err(|e| {
                Error::IoError(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        if let Some(parent) = self.log.file.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Path of the install ledger
    pub fn ledger_path(&self) -> PathBuf {
        self.paths.prefix.join(LEDGER_FILE)
    }

    /// Recipe directories in indexing order; later entries win on name clashes
    pub fn recipe_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.recipes.extra_dirs.clone();
        dirs.push(self.paths.recipes.clone());
        dirs
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::parse(
            r#"
[paths]
prefix = "/opt/pantry"

[command]
timeout = 5
"#,
        )
        .unwrap();

        assert_eq!(config.paths.prefix, PathBuf::from("/opt/pantry"));
        assert_eq!(config.paths.link, PathsConfig::default().link);
        assert_eq!(config.command_timeout(), Duration::from_secs(5));
        assert_eq!(config.defaults.repo, "stable");
        assert!(!config.update.keep_backup);
    }

    #[test]
    fn test_ledger_path_under_prefix() {
        let config = Config::with_base(Path::new("/base"));
        assert_eq!(config.ledger_path(), PathBuf::from("/base/builds/installed.yaml"));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/x/y")), home.join("x/y"));
        }
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_write_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf").join("pantry.toml");

        let mut config = Config::with_base(temp.path());
        config.update.keep_backup = true;
        config.write(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_recipe_dirs_order() {
        let mut config = Config::with_base(Path::new("/base"));
        config.recipes.extra_dirs = vec![PathBuf::from("/shared/recipes")];
        assert_eq!(
            config.recipe_dirs(),
            vec![PathBuf::from("/shared/recipes"), PathBuf::from("/base/recipes")]
        );
    }

    #[test]
    fn test_ensure_dirs() {
        let temp = TempDir::new().unwrap();
        let config = Config::with_base(temp.path());
        config.ensure_dirs().unwrap();
        assert!(config.paths.prefix.is_dir());
        assert!(config.paths.link.is_dir());
        assert!(config.paths.source.is_dir());
        assert!(config.paths.recipes.is_dir());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::parse("paths = 3"),
            Err(Error::ConfigError(_))
        ));
    }
}
