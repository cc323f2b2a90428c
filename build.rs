// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Positional list of recipe names
fn programs_arg(required: bool) -> Arg {
    Arg::new("programs")
        .value_name("PROG")
        .num_args(1..)
        .required(required)
        .help("Recipe names")
}

fn build_cli() -> Command {
    Command::new("pantry")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Pantry Contributors")
        .about("Build programs from source and link them into one tree")
        .subcommand_required(true)
        .arg(
            Arg::new("conf")
                .short('c')
                .long("conf")
                .value_name("FILE")
                .global(true)
                .help("Config file to use (default: ~/.pantry.toml)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Show log output on the console; repeat for more detail"),
        )
        .subcommand(
            Command::new("install")
                .about("Build and install programs")
                .arg(programs_arg(true)),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove installed programs")
                .arg(programs_arg(true)),
        )
        .subcommand(
            Command::new("update")
                .about("Rebuild programs whose source has changed (all installed when none given)")
                .arg(programs_arg(false)),
        )
        .subcommand(Command::new("list").about("List installed programs"))
        .subcommand(Command::new("available").about("List available recipes"))
        .subcommand(
            Command::new("display")
                .about("Show detailed information about recipes")
                .arg(programs_arg(true)),
        )
        .subcommand(
            Command::new("search")
                .about("Search recipe names and descriptions")
                .arg(
                    Arg::new("words")
                        .value_name("WORD")
                        .num_args(1..)
                        .required(true)
                        .help("Words to look for"),
                ),
        )
        .subcommand(
            Command::new("create-conf")
                .about("Write the effective config file, overwriting any existing one"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("pantry.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
