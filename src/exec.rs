// ABOUTME: High-level remote operations built on connections and sessions.
// ABOUTME: Captured commands, interactive shells, inventory discovery and multi-host tails.

use crate::config::{Config, ServerConfig};
use crate::error::{Error, Result};
use crate::fanout::fan_out;
use crate::inventory::{HostRecord, parse_inventory};
use crate::ssh::{
    CommandResult, Connection, ConnectionConfig, Credential, RemoteChannel, Session,
    SessionFactory, authenticate,
};
use crate::tee::LineSink;
use futures::future::join_all;
use std::time::Duration;
use tokio::io::AsyncWrite;

/// Placeholder in `log_path_format` replaced by the record name.
pub const NAME_PLACEHOLDER: &str = "%s";

/// Authenticate `credential` and dial the host described by `config`.
pub async fn connect(config: &ConnectionConfig, credential: Credential) -> Result<Connection> {
    let auth = authenticate(credential)?;
    Ok(Connection::dial(config, auth).await?)
}

/// Connect, run one captured command, and disconnect.
pub async fn execute(
    config: &ConnectionConfig,
    credential: Credential,
    command: &str,
    timeout: Duration,
) -> Result<CommandResult> {
    let connection = connect(config, credential).await?;
    run_and_close(&connection, command, timeout).await
}

/// Connect and attach the local terminal to a remote login shell.
pub async fn interactive(config: &ConnectionConfig, credential: Credential) -> Result<()> {
    let connection = connect(config, credential).await?;
    shell_and_close(&connection).await
}

/// Run `command` on `connection`, then disconnect whether or not it succeeded.
pub async fn run_and_close<S: SessionFactory>(
    connection: &S,
    command: &str,
    timeout: Duration,
) -> Result<CommandResult> {
    let result = run_command(connection, command, timeout).await;
    close_quietly(connection).await;
    result
}

/// Attach a shell on `connection`, then disconnect however it ended.
pub async fn shell_and_close<S: SessionFactory>(connection: &S) -> Result<()> {
    let result = open_shell(connection).await;
    close_quietly(connection).await;
    result
}

/// Run `command` in a fresh session on `connection`.
pub async fn run_command<S: SessionFactory>(
    connection: &S,
    command: &str,
    timeout: Duration,
) -> Result<CommandResult> {
    let session = connection.open_session().await?;
    run_in_session(session, command, timeout).await
}

/// Run `command` in `session` and close the session afterwards, whatever
/// the outcome. Closing also tears down a command left running by a timeout.
pub async fn run_in_session<C: RemoteChannel>(
    mut session: Session<C>,
    command: &str,
    timeout: Duration,
) -> Result<CommandResult> {
    let result = session.run(command, timeout).await;
    if let Err(e) = session.close().await {
        tracing::debug!("session close after command: {}", e);
    }
    Ok(result?)
}

pub async fn open_shell<S: SessionFactory>(connection: &S) -> Result<()> {
    let session = connection.open_session().await?;
    Ok(session.shell().await?)
}

/// Run the inventory `script` on `connection` and parse what it prints.
///
/// An empty script lists nothing. A non-zero exit is logged and whatever the
/// script printed is still parsed, since partial listings are common.
pub async fn discover<S: SessionFactory>(
    connection: &S,
    script: &str,
    timeout: Duration,
) -> Result<Vec<HostRecord>> {
    if script.trim().is_empty() {
        return Ok(Vec::new());
    }
    let session = connection.open_session().await?;
    discover_in_session(session, script, timeout).await
}

pub async fn discover_in_session<C: RemoteChannel>(
    session: Session<C>,
    script: &str,
    timeout: Duration,
) -> Result<Vec<HostRecord>> {
    if script.trim().is_empty() {
        return Ok(Vec::new());
    }
    let host = session.host().to_string();
    let result = run_in_session(session, script, timeout).await?;
    if !result.success() {
        tracing::warn!(
            %host,
            exit_status = result.exit_status,
            stderr = %result.stderr.trim(),
            "inventory script exited with an error"
        );
    }
    Ok(parse_inventory(&result.stdout)?)
}

/// Inventory of one server, or why it could not be listed.
#[derive(Debug)]
pub struct ServerInventory {
    pub server: String,
    pub records: Result<Vec<HostRecord>>,
}

/// List `servers`, at most `config.max_concurrency` at a time.
///
/// One server failing does not stop the others; its error is kept in the
/// corresponding entry. Entries follow the order of `servers`.
pub async fn discover_all(
    config: &Config,
    servers: Vec<&ServerConfig>,
    script: &str,
) -> Vec<ServerInventory> {
    fan_out(servers, config.max_concurrency, |server| async move {
        let records = discover_server(config, server, script).await;
        ServerInventory {
            server: server.label().to_string(),
            records,
        }
    })
    .await
}

async fn discover_server(
    config: &Config,
    server: &ServerConfig,
    script: &str,
) -> Result<Vec<HostRecord>> {
    let connection = connect(&config.connection_config(server), config.credential(server)).await?;
    let records = discover(&connection, script, config.timeout).await;
    close_quietly(&connection).await;
    records
}

/// Assemble the remote tail command for the record called `name`.
///
/// Every `%s` in `log_path_format` is replaced with `name`.
pub fn build_tail_command(tail_cmd: &str, log_path_format: &str, name: &str) -> Result<String> {
    let tail_cmd = tail_cmd.trim();
    if tail_cmd.is_empty() {
        return Err(Error::MissingTailCommand);
    }
    let path = log_path_format.replace(NAME_PLACEHOLDER, name);
    Ok(format!("{tail_cmd} {path}"))
}

/// A streamed command waiting to run in its own session.
pub struct StreamJob<C: RemoteChannel> {
    pub label: String,
    pub session: Session<C>,
    pub command: String,
}

/// Run every job at once, multiplexing their output into `sink`.
///
/// Returns each job's label and exit status in job order once every job has
/// finished, or the first failure after all of them have stopped.
pub async fn stream_all<C, W>(jobs: Vec<StreamJob<C>>, sink: &LineSink<W>) -> Result<Vec<(String, i32)>>
where
    C: RemoteChannel,
    W: AsyncWrite + Unpin,
{
    let runs = jobs.into_iter().map(|job| async move {
        let StreamJob {
            label,
            mut session,
            command,
        } = job;
        let status = session.stream(&command, &label, sink).await;
        if let Err(e) = session.close().await {
            tracing::debug!(%label, "session close after stream: {}", e);
        }
        status.map(|status| (label, status))
    });

    join_all(runs)
        .await
        .into_iter()
        .map(|r| r.map_err(Error::from))
        .collect()
}

/// Follow the log of every record in `names` on `connection`, one session each.
pub async fn tail<S, W>(
    connection: &S,
    names: &[String],
    tail_cmd: &str,
    log_path_format: &str,
    sink: &LineSink<W>,
) -> Result<Vec<(String, i32)>>
where
    S: SessionFactory,
    W: AsyncWrite + Unpin,
{
    let mut jobs = Vec::with_capacity(names.len());
    for name in names {
        let command = build_tail_command(tail_cmd, log_path_format, name)?;
        tracing::debug!(%name, %command, "starting tail");
        jobs.push(StreamJob {
            label: name.clone(),
            session: connection.open_session().await?,
            command,
        });
    }
    stream_all(jobs, sink).await
}

async fn close_quietly<S: SessionFactory>(connection: &S) {
    if let Err(e) = connection.close().await {
        tracing::warn!(addr = %connection.addr(), "disconnect failed: {}", e);
    }
}
