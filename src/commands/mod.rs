// ABOUTME: Command module aggregator for the panda CLI.
// ABOUTME: Re-exports the ssh, exec, branch, log, config, and debug command handlers.

mod branch;
mod config;
mod connection;
mod debug;
mod exec;
mod log;
mod shell;

pub use branch::branch;
pub use config::show_config;
pub use debug::debug;
pub use exec::exec_command;
pub use log::tail_logs;
pub use shell::shell;
