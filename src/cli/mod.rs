// src/cli/mod.rs
//! CLI definitions for pantry
//!
//! The command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pantry")]
#[command(author = "Pantry Contributors")]
#[command(version)]
#[command(about = "Build programs from source and link them into one tree", long_about = None)]
pub struct Cli {
    /// Config file to use (default: ~/.pantry.toml)
    #[arg(short = 'c', long = "conf", value_name = "FILE", global = true)]
    pub conf: Option<PathBuf>,

    /// Show log output on the console; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build and install programs
    Install {
        /// Recipe names
        #[arg(required = true)]
        programs: Vec<String>,
    },

    /// Remove installed programs
    Remove {
        /// Recipe names
        #[arg(required = true)]
        programs: Vec<String>,
    },

    /// Rebuild programs whose source has changed (all installed when none given)
    Update {
        /// Recipe names
        programs: Vec<String>,
    },

    /// List installed programs
    List,

    /// List available recipes
    Available,

    /// Show detailed information about recipes
    Display {
        /// Recipe names
        #[arg(required = true)]
        programs: Vec<String>,
    },

    /// Search recipe names and descriptions
    Search {
        /// Words to look for
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Write the effective config file, overwriting any existing one
    CreateConf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_update_without_programs() {
        let cli = Cli::try_parse_from(["pantry", "-vv", "update"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Update { programs } if programs.is_empty()));
    }

    #[test]
    fn test_install_requires_a_program() {
        assert!(Cli::try_parse_from(["pantry", "install"]).is_err());

        let cli = Cli::try_parse_from(["pantry", "install", "ag", "vim", "-c", "/tmp/p.toml"])
            .unwrap();
        assert_eq!(cli.conf, Some(PathBuf::from("/tmp/p.toml")));
        assert!(matches!(cli.command, Commands::Install { programs } if programs == ["ag", "vim"]));
    }
}
