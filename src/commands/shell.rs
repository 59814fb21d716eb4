// ABOUTME: Ssh command implementation.
// ABOUTME: Opens an interactive login shell on one server.

use panda::config::Config;
use panda::error::Result;
use panda::exec;
use panda::output::Output;

/// Attach the local terminal to a shell on the named (or first) server.
pub async fn shell(config: Config, server: Option<String>, output: Output) -> Result<()> {
    let server = config.server(server.as_deref())?;
    output.progress(&format!("  → Connecting to {}...", server.label()));
    exec::interactive(&config.connection_config(server), config.credential(server)).await
}
