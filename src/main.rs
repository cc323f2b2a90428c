// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use pantry::config::expand_home;
use pantry::{Config, Request};
use std::fs;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Install the tracing subscriber
///
/// Everything the filter admits goes to the log file; the console only
/// shows warnings and errors unless `-v` is given. The returned guard must
/// live until exit so buffered file output gets flushed.
fn init_logging(config: &Config, verbose: u8) -> Option<WorkerGuard> {
    let level_filter = match verbose {
        0 | 1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let console_level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("PANTRY_LOG")
        .from_env_lossy();

    let log_file = &config.log.file;
    let dir = log_file.parent().filter(|p| !p.as_os_str().is_empty());
    let file_name = log_file.file_name();

    let (Some(dir), Some(file_name)) = (dir, file_name) else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr.with_max_level(console_level))
            .without_time()
            .try_init();
        return None;
    };

    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!(
            "Warning: failed to create log directory {}: {}",
            dir.display(),
            e
        );
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr.with_max_level(console_level))
            .without_time()
            .try_init();
        return None;
    }

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr.with_max_level(console_level).and(file_writer))
        .with_ansi(false)
        .try_init();

    Some(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .conf
        .as_deref()
        .map(expand_home)
        .unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let _log_guard = init_logging(&config, cli.verbose);
    tracing::debug!("Using config {}", config_path.display());

    let request = match cli.command {
        Commands::CreateConf => return commands::cmd_create_conf(&config, &config_path),
        Commands::Install { programs } => Request::Install(programs),
        Commands::Remove { programs } => Request::Remove(programs),
        Commands::Update { programs } => Request::Update(programs),
        Commands::List => Request::ListInstalled,
        Commands::Available => Request::ListAvailable,
        Commands::Display { programs } => Request::Display(programs),
        Commands::Search { words } => Request::Search(words),
    };

    commands::cmd_request(config, request)
}
