// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "panda")]
#[command(about = "Shell, logs and branch listings for QA servers over SSH")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output for scripting
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Output JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to config.yml (defaults to $PANDA_CONFIG or ~/.config/panda/config.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open an interactive shell on a server
    Ssh {
        /// Server name or host (defaults to the first configured server)
        server: Option<String>,
    },

    /// Run a command on servers and print its output
    Exec {
        /// Only run on this server
        #[arg(short, long)]
        server: Option<String>,

        /// Command to run
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// List checked-out branches on servers
    #[command(alias = "b")]
    Branch {
        #[arg(short, long)]
        server: Option<String>,

        /// Include entries that are not git checkouts
        #[arg(long)]
        all: bool,

        /// Show when the branch was last committed to
        #[arg(long)]
        ago: bool,
    },

    /// Pick entries and follow their error logs
    #[command(alias = "l")]
    Log {
        #[arg(short, long)]
        server: Option<String>,
    },

    /// Show the config file, creating it if missing
    #[command(alias = "c")]
    Config,

    /// Print every discovered entry with all fields
    Debug {
        #[arg(short, long)]
        server: Option<String>,
    },
}
