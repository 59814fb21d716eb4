// ABOUTME: A RemoteChannel that replays a fixed script of events.
// ABOUTME: Records every request made on it so tests can assert on them.

use async_trait::async_trait;
use panda::ssh::{ChannelEvent, RemoteChannel, Result, Session};
use parking_lot::Mutex;
use russh::Pty;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One step of a channel script.
#[derive(Debug, Clone)]
pub enum Step {
    Event(ChannelEvent),
    /// Wait before the next step.
    Delay(Duration),
    /// Never produce another event.
    Hang,
}

impl Step {
    pub fn stdout(text: &str) -> Self {
        Step::Event(ChannelEvent::Stdout(text.as_bytes().to_vec()))
    }

    pub fn stderr(text: &str) -> Self {
        Step::Event(ChannelEvent::Stderr(text.as_bytes().to_vec()))
    }

    pub fn exit(status: u32) -> Self {
        Step::Event(ChannelEvent::ExitStatus(status))
    }

    pub fn success() -> Self {
        Step::Event(ChannelEvent::Success)
    }

    pub fn failure() -> Self {
        Step::Event(ChannelEvent::Failure)
    }

    pub fn eof() -> Self {
        Step::Event(ChannelEvent::Eof)
    }

    pub fn close() -> Self {
        Step::Event(ChannelEvent::Close)
    }

    pub fn delay_ms(ms: u64) -> Self {
        Step::Delay(Duration::from_millis(ms))
    }
}

/// A successful command: exec accepted, output, exit status, end of stream.
pub fn finished_command(stdout: &str, stderr: &str, status: u32) -> Vec<Step> {
    vec![
        Step::success(),
        Step::stdout(stdout),
        Step::stderr(stderr),
        Step::exit(status),
        Step::eof(),
        Step::close(),
    ]
}

/// Everything the session asked the channel to do.
#[derive(Debug, Default)]
pub struct Recorded {
    pub pty: Option<(String, u32, u32)>,
    pub echo_requested: bool,
    pub shell_requested: bool,
    pub commands: Vec<String>,
    pub sent: Vec<u8>,
    pub eof_sent: bool,
    pub closes: usize,
}

pub struct ScriptedChannel {
    steps: VecDeque<Step>,
    log: Arc<Mutex<Recorded>>,
}

impl ScriptedChannel {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> (Self, Arc<Mutex<Recorded>>) {
        let log = Arc::new(Mutex::new(Recorded::default()));
        let channel = Self {
            steps: steps.into_iter().collect(),
            log: log.clone(),
        };
        (channel, log)
    }
}

/// A fresh session over a scripted channel.
pub fn scripted_session(
    host: &str,
    steps: impl IntoIterator<Item = Step>,
) -> (Session<ScriptedChannel>, Arc<Mutex<Recorded>>) {
    let (channel, log) = ScriptedChannel::new(steps);
    (Session::new(channel, host), log)
}

#[async_trait]
impl RemoteChannel for ScriptedChannel {
    async fn request_pty(
        &mut self,
        term: &str,
        cols: u32,
        rows: u32,
        modes: &[(Pty, u32)],
    ) -> Result<()> {
        let mut log = self.log.lock();
        log.pty = Some((term.to_string(), cols, rows));
        log.echo_requested = modes
            .iter()
            .any(|(mode, value)| matches!(mode, Pty::ECHO) && *value == 1);
        Ok(())
    }

    async fn request_shell(&mut self) -> Result<()> {
        self.log.lock().shell_requested = true;
        Ok(())
    }

    async fn exec(&mut self, command: &str) -> Result<()> {
        self.log.lock().commands.push(command.to_string());
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.log.lock().sent.extend_from_slice(data);
        Ok(())
    }

    async fn send_eof(&mut self) -> Result<()> {
        self.log.lock().eof_sent = true;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            match self.steps.front()?.clone() {
                Step::Event(event) => {
                    self.steps.pop_front();
                    return Some(event);
                }
                Step::Delay(duration) => {
                    // Only consume the delay once it has fully elapsed.
                    tokio::time::sleep(duration).await;
                    self.steps.pop_front();
                }
                Step::Hang => std::future::pending::<()>().await,
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().closes += 1;
        Ok(())
    }
}
