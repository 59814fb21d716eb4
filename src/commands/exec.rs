// ABOUTME: Exec command implementation.
// ABOUTME: Runs one captured command on each selected server with bounded concurrency.

use panda::config::{Config, ServerConfig};
use panda::error::{Error, Result};
use panda::exec;
use panda::fanout::fan_out;
use panda::output::Output;
use panda::ssh::CommandResult;

/// Execute `command` on the selected servers and print each result.
pub async fn exec_command(
    config: Config,
    server: Option<String>,
    command: Vec<String>,
    mut output: Output,
) -> Result<()> {
    let servers = config.select_servers(server.as_deref())?;
    let command = command.join(" ");
    output.start_timer();

    let outcomes = fan_out(servers, config.max_concurrency, |server| {
        let config = &config;
        let output = &output;
        let command = &command;
        async move {
            let result = exec_on_server(config, server, command, output).await;
            (server.label().to_string(), result)
        }
    })
    .await;

    let mut first_error = None;
    for (host, result) in outcomes {
        match result {
            Ok(result) => {
                output.command_result(&host, &result);
                if !result.success() {
                    first_error.get_or_insert(Error::CommandFailed {
                        host,
                        exit_status: result.exit_status,
                    });
                }
            }
            Err(e) => {
                output.error(&format!("{host}: {e}"));
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            output.success("Done");
            Ok(())
        }
    }
}

async fn exec_on_server(
    config: &Config,
    server: &ServerConfig,
    command: &str,
    output: &Output,
) -> Result<CommandResult> {
    output.progress(&format!("  → Running on {}...", server.label()));
    exec::execute(
        &config.connection_config(server),
        config.credential(server),
        command,
        config.timeout,
    )
    .await
}
