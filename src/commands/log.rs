// ABOUTME: Log command implementation.
// ABOUTME: Lets the user pick entries with the select filter, then tails their logs together.

use super::connection::{connect_to_server, disconnect, report_warnings};
use panda::config::Config;
use panda::diagnostics::Diagnostics;
use panda::error::{Error, Result};
use panda::exec;
use panda::output::Output;
use panda::select::select;
use panda::ssh::Connection;
use panda::tee::LineSink;

/// Follow the logs of the entries the user selects on one server.
///
/// Runs until every tail ends or the user interrupts with Ctrl-C.
pub async fn tail_logs(config: Config, server: Option<String>, output: Output) -> Result<()> {
    let server = config.server(server.as_deref())?;
    let mut diag = Diagnostics::default();

    let connection = connect_to_server(&config, server, &output).await?;
    let result = select_and_tail(&config, &connection, &output).await;
    disconnect(server, &connection, &mut diag).await;

    report_warnings(&diag, &output);
    result
}

async fn select_and_tail(config: &Config, connection: &Connection, output: &Output) -> Result<()> {
    // Names are all that is needed, so prefer the cheaper listing.
    let script = if config.scripts.paths.trim().is_empty() {
        &config.scripts.branches
    } else {
        &config.scripts.paths
    };
    let records = exec::discover(connection, script, config.timeout).await?;
    if records.is_empty() {
        return Err(Error::NoSelection);
    }

    let names: Vec<String> = records.into_iter().map(|r| r.name).collect();
    let selected = select(&config.select_cmd, &names).await?;
    output.progress(&format!("  → Following {} log(s)...", selected.len()));

    let sink = LineSink::new(tokio::io::stdout());
    tokio::select! {
        finished = exec::tail(connection, &selected, &config.tail_cmd, &config.log_path_format, &sink) => {
            for (name, status) in finished? {
                tracing::debug!(%name, status, "tail ended");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("interrupted, stopping tails");
        }
    }
    Ok(())
}
