// ABOUTME: SSH-specific error types.
// ABOUTME: Covers credentials, connection setup, interactive shells, and captured commands.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read key from {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid private key: {0}")]
    KeyParse(#[source] russh::keys::Error),

    #[error("cannot reach {addr}: {reason}")]
    Network { addr: String, reason: String },

    #[error("authentication rejected for {user}@{addr}")]
    AuthRejected { user: String, addr: String },

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("pseudo-terminal request refused: {0}")]
    PtyRequestFailed(String),

    #[error("cannot change local terminal mode: {0}")]
    TerminalMode(#[source] std::io::Error),

    #[error("remote shell exited abnormally{}", exit_suffix(.exit_status))]
    RemoteShell { exit_status: Option<i32> },

    #[error("command timed out after {0:?}")]
    CommandTimedOut(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("session already used; open a new session per command")]
    SessionReused,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_suffix(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" with status {code}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
