// ABOUTME: One unit of remote work on an SSH connection.
// ABOUTME: Runs an interactive shell, a captured command with a deadline, or a streamed command.

use super::error::{Error, Result};
use super::terminal::{CrosstermTerminal, DEFAULT_SIZE, LocalTerminal, RawModeGuard};
use crate::tee::{LineSink, Source, StreamTag, tee};
use async_trait::async_trait;
use russh::client::Msg;
use russh::{Channel, ChannelMsg, Pty};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};

/// Terminal type requested for interactive shells.
pub const TERM_TYPE: &str = "xterm";

/// Terminal modes requested for interactive shells.
pub const SHELL_MODES: &[(Pty, u32)] = &[
    (Pty::ECHO, 1),
    (Pty::TTY_OP_ISPEED, 14400),
    (Pty::TTY_OP_OSPEED, 14400),
];

/// Exit status reported when the remote process ended on a signal.
pub const SIGNALED_EXIT_STATUS: i32 = -1;

/// Buffer size of the pipes between a streamed command and the multiplexer.
const STREAM_PIPE_CAPACITY: usize = 64 * 1024;

/// Something that happened on a remote channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    ExitStatus(u32),
    ExitSignal(String),
    /// Positive reply to a request sent with want-reply.
    Success,
    /// Negative reply to a request sent with want-reply.
    Failure,
    Eof,
    Close,
}

/// A remote command channel.
///
/// `next_event` returns `None` once the underlying transport is gone, and must
/// be safe to cancel: an event is never lost when the call is dropped.
#[async_trait]
pub trait RemoteChannel: Send {
    async fn request_pty(
        &mut self,
        term: &str,
        cols: u32,
        rows: u32,
        modes: &[(Pty, u32)],
    ) -> Result<()>;

    async fn request_shell(&mut self) -> Result<()>;

    async fn exec(&mut self, command: &str) -> Result<()>;

    async fn send(&mut self, data: &[u8]) -> Result<()>;

    async fn send_eof(&mut self) -> Result<()>;

    async fn next_event(&mut self) -> Option<ChannelEvent>;

    async fn close(&mut self) -> Result<()>;
}

/// A russh session channel.
pub struct RusshChannel {
    inner: Channel<Msg>,
}

impl RusshChannel {
    pub fn new(inner: Channel<Msg>) -> Self {
        Self { inner }
    }
}

fn transport(context: &str) -> impl FnOnce(russh::Error) -> Error + '_ {
    move |e| Error::Transport(format!("{context}: {e}"))
}

#[async_trait]
impl RemoteChannel for RusshChannel {
    async fn request_pty(
        &mut self,
        term: &str,
        cols: u32,
        rows: u32,
        modes: &[(Pty, u32)],
    ) -> Result<()> {
        self.inner
            .request_pty(true, term, cols, rows, 0, 0, modes)
            .await
            .map_err(|e| Error::PtyRequestFailed(e.to_string()))
    }

    async fn request_shell(&mut self) -> Result<()> {
        self.inner
            .request_shell(true)
            .await
            .map_err(transport("failed to request shell"))
    }

    async fn exec(&mut self, command: &str) -> Result<()> {
        self.inner
            .exec(true, command)
            .await
            .map_err(transport("failed to exec command"))
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.inner
            .data(data)
            .await
            .map_err(transport("failed to send input"))
    }

    async fn send_eof(&mut self) -> Result<()> {
        self.inner.eof().await.map_err(transport("failed to send eof"))
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            let event = match self.inner.wait().await? {
                ChannelMsg::Data { data } => ChannelEvent::Stdout(data.to_vec()),
                ChannelMsg::ExtendedData { data, ext: 1 } => ChannelEvent::Stderr(data.to_vec()),
                ChannelMsg::ExitStatus { exit_status } => ChannelEvent::ExitStatus(exit_status),
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    ChannelEvent::ExitSignal(format!("{signal_name:?}"))
                }
                ChannelMsg::Success => ChannelEvent::Success,
                ChannelMsg::Failure => ChannelEvent::Failure,
                ChannelMsg::Eof => ChannelEvent::Eof,
                ChannelMsg::Close => ChannelEvent::Close,
                _ => continue,
            };
            return Some(event);
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await.map_err(Error::Protocol)
    }
}

/// Lifecycle of a [`Session`]. There is no way back to `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    /// A pseudo-terminal has been granted.
    Configured,
    Running,
    Completed,
    Failed,
}

/// Outcome of a captured command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Remote exit status; [`SIGNALED_EXIT_STATUS`] when killed by a signal.
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// One logical unit of remote work bound to a connection.
///
/// A session runs exactly one command or shell; open a new one per command.
pub struct Session<C: RemoteChannel> {
    channel: C,
    host: String,
    state: SessionState,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl<C: RemoteChannel> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("state", &self.state)
            .finish()
    }
}

impl<C: RemoteChannel> Session<C> {
    pub fn new(channel: C, host: impl Into<String>) -> Self {
        Self {
            channel,
            host: host.into(),
            state: SessionState::Created,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn begin(&mut self) -> Result<()> {
        if self.state != SessionState::Created {
            return Err(Error::SessionReused);
        }
        self.state = SessionState::Running;
        Ok(())
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        self.state = if result.is_ok() {
            SessionState::Completed
        } else {
            SessionState::Failed
        };
        result
    }

    /// Run `command` with its output captured, bounded by `timeout`.
    ///
    /// A non-zero remote exit is reported in the result, not as an error. On
    /// timeout the remote process may still be running; close the session to
    /// tear it down.
    pub async fn run(&mut self, command: &str, timeout: Duration) -> Result<CommandResult> {
        self.begin()?;
        self.stdout.clear();
        self.stderr.clear();
        tracing::debug!(host = %self.host, %command, ?timeout, "running captured command");

        let outcome = tokio::time::timeout(timeout, self.capture(command)).await;
        let result = match outcome {
            Ok(Ok(exit_status)) => Ok(CommandResult {
                exit_status,
                stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::CommandTimedOut(timeout)),
        };
        self.finish(result)
    }

    async fn capture(&mut self, command: &str) -> Result<i32> {
        self.channel.exec(command).await?;

        let mut exit_status = None;
        let mut got_eof = false;

        loop {
            match self.channel.next_event().await {
                Some(ChannelEvent::Stdout(data)) => self.stdout.extend_from_slice(&data),
                Some(ChannelEvent::Stderr(data)) => self.stderr.extend_from_slice(&data),
                Some(ChannelEvent::ExitStatus(code)) => {
                    exit_status = Some(code as i32);
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelEvent::ExitSignal(signal)) => {
                    tracing::debug!(host = %self.host, %signal, "remote command killed by signal");
                    exit_status.get_or_insert(SIGNALED_EXIT_STATUS);
                }
                Some(ChannelEvent::Eof) => {
                    got_eof = true;
                    if exit_status.is_some() {
                        break;
                    }
                }
                Some(ChannelEvent::Failure) => {
                    return Err(Error::Transport(
                        "remote refused to execute command".to_string(),
                    ));
                }
                Some(ChannelEvent::Success) => {}
                Some(ChannelEvent::Close) | None => break,
            }
        }

        exit_status.ok_or_else(|| {
            Error::Transport("channel closed without exit status".to_string())
        })
    }

    /// Run `command` and copy its output into `sink` while it runs.
    ///
    /// Lines are labelled with `label` and an `out >>` / `err >>` marker.
    /// Returns the remote exit status once both streams are drained.
    pub async fn stream<W>(&mut self, command: &str, label: &str, sink: &LineSink<W>) -> Result<i32>
    where
        W: AsyncWrite + Unpin,
    {
        self.begin()?;
        tracing::debug!(host = %self.host, %command, %label, "streaming command");
        let result = self.stream_inner(command, label, sink).await;
        self.finish(result)
    }

    async fn stream_inner<W>(&mut self, command: &str, label: &str, sink: &LineSink<W>) -> Result<i32>
    where
        W: AsyncWrite + Unpin,
    {
        self.channel.exec(command).await?;

        let (out_tx, out_rx) = tokio::io::duplex(STREAM_PIPE_CAPACITY);
        let (err_tx, err_rx) = tokio::io::duplex(STREAM_PIPE_CAPACITY);

        let sources = vec![
            Source::tagged(label, StreamTag::Out, out_rx),
            Source::tagged(label, StreamTag::Err, err_rx),
        ];
        let pump = pump_output(&mut self.channel, out_tx, err_tx);
        let (status, teed) = tokio::join!(pump, tee(sources, sink));
        let status = status?;
        teed?;
        Ok(status)
    }

    /// Bridge the local terminal to a remote login shell until it exits.
    pub async fn shell(self) -> Result<()> {
        self.shell_with(
            &CrosstermTerminal,
            tokio::io::stdin(),
            tokio::io::stdout(),
            tokio::io::stderr(),
        )
        .await
    }

    /// Interactive shell over explicit terminal and I/O handles.
    ///
    /// The local terminal is put in raw mode only while the remote shell runs
    /// and is restored on every exit path before this returns.
    pub async fn shell_with<T, I, O, E>(
        mut self,
        terminal: &T,
        input: I,
        output: O,
        errors: E,
    ) -> Result<()>
    where
        T: LocalTerminal + ?Sized,
        I: AsyncRead + Unpin,
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        if self.state != SessionState::Created {
            return Err(Error::SessionReused);
        }

        let (cols, rows) = terminal.size().unwrap_or(DEFAULT_SIZE);
        tracing::debug!(host = %self.host, cols, rows, "requesting pty");
        match self.request_terminal(cols.into(), rows.into()).await {
            Ok(()) => self.state = SessionState::Configured,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        }

        let guard = match RawModeGuard::acquire(terminal) {
            Ok(guard) => guard,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };
        self.state = SessionState::Running;
        let result = self.bridge(input, output, errors).await;
        drop(guard);

        if let Err(ref e) = result {
            tracing::debug!(host = %self.host, "shell ended: {}", e);
        }
        let result = self.finish(result);
        if let Err(e) = self.channel.close().await {
            tracing::debug!("channel close after shell: {}", e);
        }
        result
    }

    async fn request_terminal(&mut self, cols: u32, rows: u32) -> Result<()> {
        self.channel
            .request_pty(TERM_TYPE, cols, rows, SHELL_MODES)
            .await?;
        match self.await_reply().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::PtyRequestFailed(
                "request refused by server".to_string(),
            )),
            Err(e) => Err(Error::PtyRequestFailed(e.to_string())),
        }
    }

    /// Wait for the reply to a want-reply request. `Ok(false)` means refused.
    ///
    /// Output arriving before the reply is held in the session buffers.
    async fn await_reply(&mut self) -> Result<bool> {
        loop {
            match self.channel.next_event().await {
                Some(ChannelEvent::Stdout(data)) => self.stdout.extend_from_slice(&data),
                Some(ChannelEvent::Stderr(data)) => self.stderr.extend_from_slice(&data),
                Some(ChannelEvent::Success) => return Ok(true),
                Some(ChannelEvent::Failure) => return Ok(false),
                Some(ChannelEvent::Close) | None => {
                    return Err(Error::Transport(
                        "channel closed while waiting for reply".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    async fn bridge<I, O, E>(&mut self, mut input: I, mut output: O, mut errors: E) -> Result<()>
    where
        I: AsyncRead + Unpin,
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        self.channel.request_shell().await?;
        if !self.await_reply().await? {
            return Err(Error::RemoteShell { exit_status: None });
        }

        if !self.stdout.is_empty() {
            output.write_all(&self.stdout).await?;
            output.flush().await?;
            self.stdout.clear();
        }
        if !self.stderr.is_empty() {
            errors.write_all(&self.stderr).await?;
            errors.flush().await?;
            self.stderr.clear();
        }

        let mut buf = vec![0u8; 8192];
        let mut input_open = true;
        let mut exit_status = None;

        loop {
            tokio::select! {
                read = input.read(&mut buf), if input_open => match read {
                    Ok(0) => {
                        input_open = false;
                        self.channel.send_eof().await?;
                    }
                    Ok(n) => self.channel.send(&buf[..n]).await?,
                    Err(e) => {
                        tracing::debug!("local input closed: {}", e);
                        input_open = false;
                    }
                },
                event = self.channel.next_event() => match event {
                    Some(ChannelEvent::Stdout(data)) => {
                        output.write_all(&data).await?;
                        output.flush().await?;
                    }
                    Some(ChannelEvent::Stderr(data)) => {
                        errors.write_all(&data).await?;
                        errors.flush().await?;
                    }
                    Some(ChannelEvent::ExitStatus(code)) => exit_status = Some(code as i32),
                    Some(ChannelEvent::ExitSignal(_)) => {
                        exit_status.get_or_insert(SIGNALED_EXIT_STATUS);
                    }
                    Some(ChannelEvent::Success | ChannelEvent::Failure | ChannelEvent::Eof) => {}
                    Some(ChannelEvent::Close) | None => break,
                },
            }
        }

        match exit_status {
            Some(0) => Ok(()),
            other => Err(Error::RemoteShell { exit_status: other }),
        }
    }

    /// Close the channel, best-effort tearing down the remote process.
    pub async fn close(mut self) -> Result<()> {
        self.channel.close().await
    }
}

/// Forward a streamed command's output into the multiplexer pipes.
///
/// The pipe writers are dropped on return so the readers see EOF.
async fn pump_output<C: RemoteChannel>(
    channel: &mut C,
    mut out_tx: DuplexStream,
    mut err_tx: DuplexStream,
) -> Result<i32> {
    let mut exit_status = None;
    let mut got_eof = false;

    loop {
        match channel.next_event().await {
            Some(ChannelEvent::Stdout(data)) => out_tx.write_all(&data).await?,
            Some(ChannelEvent::Stderr(data)) => err_tx.write_all(&data).await?,
            Some(ChannelEvent::ExitStatus(code)) => {
                exit_status = Some(code as i32);
                if got_eof {
                    break;
                }
            }
            Some(ChannelEvent::ExitSignal(_)) => {
                exit_status.get_or_insert(SIGNALED_EXIT_STATUS);
            }
            Some(ChannelEvent::Eof) => {
                got_eof = true;
                if exit_status.is_some() {
                    break;
                }
            }
            Some(ChannelEvent::Failure) => {
                return Err(Error::Transport(
                    "remote refused to execute command".to_string(),
                ));
            }
            Some(ChannelEvent::Success) => {}
            Some(ChannelEvent::Close) | None => break,
        }
    }

    exit_status.ok_or_else(|| Error::Transport("channel closed without exit status".to_string()))
}
