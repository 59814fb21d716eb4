// ABOUTME: SSH client module for remote hosts.
// ABOUTME: Credentials, connections, sessions (shell, captured, streamed) and terminal control.

mod auth;
mod connection;
mod error;
mod session;
mod terminal;

pub use auth::{AuthMethod, Credential, authenticate};
pub use connection::{
    Connection, ConnectionConfig, DEFAULT_PORT, Dialer, SessionFactory, TcpDialer,
    normalize_address,
};
pub use error::{Error, Result};
pub use session::{
    ChannelEvent, CommandResult, RemoteChannel, RusshChannel, SHELL_MODES,
    SIGNALED_EXIT_STATUS, Session, SessionState, TERM_TYPE,
};
pub use terminal::{CrosstermTerminal, DEFAULT_SIZE, LocalTerminal, RawModeGuard};
