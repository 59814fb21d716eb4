// ABOUTME: Entry point for the panda CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use panda::config::Config;
use panda::error::{Error, Result};
use panda::output::{Output, OutputMode};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    let code = match run(cli, mode).await {
        Ok(()) => 0,
        Err(e) => {
            Output::new(mode).error(&e.to_string());
            exit_code(&e)
        }
    };

    // A blocking stdin read left over from an interactive shell would keep
    // the runtime from shutting down.
    std::process::exit(code);
}

/// Remote exit statuses pass through; everything else is 1.
fn exit_code(error: &Error) -> i32 {
    let status = match error {
        Error::CommandFailed { exit_status, .. } => Some(*exit_status),
        Error::Ssh(panda::ssh::Error::RemoteShell { exit_status }) => *exit_status,
        _ => None,
    };
    status.filter(|s| (1..=255).contains(s)).unwrap_or(1)
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    let path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    match cli.command {
        Commands::Config => commands::show_config(&path, output),
        Commands::Ssh { server } => commands::shell(load_config(&path)?, server, output).await,
        Commands::Exec { server, command } => {
            commands::exec_command(load_config(&path)?, server, command, output).await
        }
        Commands::Branch { server, all, ago } => {
            commands::branch(load_config(&path)?, server, all, ago, output).await
        }
        Commands::Log { server } => commands::tail_logs(load_config(&path)?, server, output).await,
        Commands::Debug { server } => commands::debug(load_config(&path)?, server, output).await,
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_init(path)?;
    tracing::debug!(path = %path.display(), servers = config.servers.len(), "loaded config");
    Ok(config)
}
