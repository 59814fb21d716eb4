// ABOUTME: Shared helpers for connecting to servers and collecting inventories.
// ABOUTME: Used by the branch, log and debug commands.

use panda::config::{Config, ServerConfig};
use panda::diagnostics::{Diagnostics, Warning};
use panda::error::Result;
use panda::exec::{self, ServerInventory};
use panda::inventory::HostRecord;
use panda::output::Output;
use panda::ssh::Connection;

/// Dial and authenticate against `server`, reporting progress.
pub async fn connect_to_server(
    config: &Config,
    server: &ServerConfig,
    output: &Output,
) -> Result<Connection> {
    output.progress(&format!("  → Connecting to {}...", server.label()));
    exec::connect(&config.connection_config(server), config.credential(server)).await
}

/// Close the connection to `server`, downgrading a failure to a warning.
pub async fn disconnect(server: &ServerConfig, connection: &Connection, diag: &mut Diagnostics) {
    if let Err(e) = connection.close().await {
        diag.warn(Warning::ssh_disconnect(
            server.label(),
            format!("{}: {}", connection.addr(), e),
        ));
    }
}

/// Run `script` on the selected servers and keep the inventories that worked.
///
/// Failed servers become warnings unless every server failed, in which case
/// the first failure is returned.
pub async fn discover_servers(
    config: &Config,
    server: Option<&str>,
    script: &str,
    output: &Output,
    diag: &mut Diagnostics,
) -> Result<Vec<(String, Vec<HostRecord>)>> {
    let servers = config.select_servers(server)?;
    output.progress(&format!("  → Listing {} server(s)...", servers.len()));

    let mut listed = Vec::new();
    let mut first_error = None;
    for ServerInventory { server, records } in exec::discover_all(config, servers, script).await {
        match records {
            Ok(records) => {
                tracing::info!(%server, count = records.len(), "discovered records");
                listed.push((server, records));
            }
            Err(e) => {
                diag.warn(Warning::discovery_failed(server.as_str(), e.to_string()));
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if listed.is_empty() => Err(e),
        _ => Ok(listed),
    }
}

/// Print collected warnings through `output`, then name any servers whose
/// entries are missing from the listing above.
pub fn report_warnings(diag: &Diagnostics, output: &Output) {
    if !diag.has_warnings() {
        return;
    }
    for warning in diag.warnings() {
        output.warning(&warning.to_string());
    }
    let skipped: Vec<&str> = diag.skipped_servers().collect();
    if !skipped.is_empty() {
        output.warning(&format!("results omit {}", skipped.join(", ")));
    }
}
