// ABOUTME: Authenticated SSH connection to a single host using russh.
// ABOUTME: Handles address normalization, dialing, host key checks, and session creation.

use super::auth::AuthMethod;
use super::error::{Error, Result};
use super::session::{RemoteChannel, RusshChannel, Session};
use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, ssh_key};
use russh::Disconnect;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Port appended to host addresses that do not name one.
pub const DEFAULT_PORT: u16 = 10022;

/// Settings for establishing a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Host address, optionally with a `:port` suffix.
    pub host: String,
    /// Username for authentication.
    pub user: String,
    /// Bound on the TCP connect phase only.
    pub connect_timeout: Duration,
    /// Port used when `host` carries none.
    pub default_port: u16,
    /// Whether to accept unknown hosts (Trust On First Use).
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            connect_timeout: Duration::from_secs(10),
            default_port: DEFAULT_PORT,
            trust_on_first_use: true,
            known_hosts_path: None,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// The `host:port` address that will actually be dialed.
    pub fn address(&self) -> String {
        normalize_address(&self.host, self.default_port)
    }
}

/// Append `default_port` to an address that has no explicit port.
///
/// Bare IPv6 literals are bracketed first so the result stays parseable.
pub fn normalize_address(host: &str, default_port: u16) -> String {
    let host = host.trim();
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((_, tail)) if tail.starts_with(':') => host.to_string(),
            _ => format!("{host}:{default_port}"),
        };
    }
    match host.matches(':').count() {
        0 => format!("{host}:{default_port}"),
        1 => host.to_string(),
        _ => format!("[{host}]:{default_port}"),
    }
}

/// Split a normalized address back into host and port.
fn split_address(addr: &str, default_port: u16) -> (String, u16) {
    match addr.rsplit_once(':') {
        Some((host, port)) => {
            let host = host.trim_start_matches('[').trim_end_matches(']');
            (host.to_string(), port.parse().unwrap_or(default_port))
        }
        None => (addr.to_string(), default_port),
    }
}

/// Opens the byte stream the SSH transport runs over.
#[async_trait]
pub trait Dialer: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn dial(&self, addr: &str) -> std::io::Result<Self::Stream>;
}

/// Plain TCP dialer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, addr: &str) -> std::io::Result<TcpStream> {
        TcpStream::connect(addr).await
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(host: String, port: u16, trust_on_first_use: bool, known_hosts_path: Option<PathBuf>) -> Self {
        Self {
            host,
            port,
            trust_on_first_use,
            known_hosts_path,
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) if self.trust_on_first_use => {
                tracing::warn!(
                    host = %self.host,
                    port = self.port,
                    "Trust-On-First-Use: accepting unknown host key"
                );
                let learn_result = match &self.known_hosts_path {
                    Some(path) => {
                        learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => learn_known_hosts(&self.host, self.port, server_public_key),
                };
                if let Err(e) = learn_result {
                    tracing::warn!("Failed to save host key to known_hosts: {}", e);
                }
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(russh::keys::Error::KeyChanged { line }) => {
                tracing::warn!(
                    host = %self.host,
                    line,
                    "host key does not match known_hosts entry"
                );
                Ok(false)
            }
            Err(_) => Ok(self.trust_on_first_use),
        }
    }
}

/// An authenticated transport to one host. Factory for [`Session`]s.
pub struct Connection {
    addr: String,
    user: String,
    handle: Handle<SshHandler>,
    closed: AtomicBool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.addr)
            .field("user", &self.user)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Connection {
    /// Dial the host over TCP and authenticate.
    pub async fn dial(config: &ConnectionConfig, auth: AuthMethod) -> Result<Self> {
        Self::dial_with(&TcpDialer, config, auth).await
    }

    /// Dial through a custom [`Dialer`] and authenticate.
    ///
    /// The connect timeout bounds only the dial itself; commands run later
    /// are bounded separately.
    pub async fn dial_with<D: Dialer>(
        dialer: &D,
        config: &ConnectionConfig,
        auth: AuthMethod,
    ) -> Result<Self> {
        let addr = config.address();
        tracing::debug!(%addr, user = %config.user, method = auth.kind(), "dialing");

        let stream = match tokio::time::timeout(config.connect_timeout, dialer.dial(&addr)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(Error::Network {
                    addr,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(Error::Network {
                    addr,
                    reason: format!("connect timed out after {:?}", config.connect_timeout),
                });
            }
        };

        let (host, port) = split_address(&addr, config.default_port);
        let handler = SshHandler::new(
            host,
            port,
            config.trust_on_first_use,
            config.known_hosts_path.clone(),
        );

        // Long-running tails and idle shells must not trip an inactivity
        // timeout, so rely on keepalives instead.
        let russh_config = Config {
            inactivity_timeout: None,
            keepalive_interval: Some(Duration::from_secs(30)),
            keepalive_max: 3,
            ..Default::default()
        };

        let mut handle = client::connect_stream(Arc::new(russh_config), stream, handler)
            .await
            .map_err(Error::Protocol)?;

        let accepted = match auth {
            AuthMethod::PublicKey(key) => {
                let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
                handle
                    .authenticate_publickey(&config.user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await?
                    .success()
            }
            AuthMethod::Password(password) => handle
                .authenticate_password(&config.user, password)
                .await?
                .success(),
        };

        if !accepted {
            let _ = handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await;
            return Err(Error::AuthRejected {
                user: config.user.clone(),
                addr,
            });
        }

        tracing::debug!(%addr, "connected");
        Ok(Self {
            addr,
            user: config.user.clone(),
            handle,
            closed: AtomicBool::new(false),
        })
    }

    /// The dialed `host:port` address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.handle.is_closed()
    }

    /// Open a fresh session channel. Use one session per command.
    pub async fn open_session(&self) -> Result<Session<RusshChannel>> {
        if self.is_closed() {
            return Err(Error::Transport("connection already closed".to_string()));
        }
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Transport(format!("failed to open channel: {e}")))?;
        Ok(Session::new(RusshChannel::new(channel), self.addr.clone()))
    }

    /// Release the transport. Calling this more than once is harmless.
    pub async fn close(&self) -> Result<()> {
        if !first_close(&self.closed) {
            return Ok(());
        }
        tracing::debug!(addr = %self.addr, "disconnecting");
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)
    }
}

/// Marks `flag` closed. True only for the call that actually closed it.
fn first_close(flag: &AtomicBool) -> bool {
    !flag.swap(true, Ordering::SeqCst)
}

/// Something that hands out sessions and can be shut down.
///
/// [`Connection`] is the real implementation.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Channel: RemoteChannel;

    /// Address used in logs.
    fn addr(&self) -> &str;

    async fn open_session(&self) -> Result<Session<Self::Channel>>;

    /// Release the transport. Must be safe to call more than once.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl SessionFactory for Connection {
    type Channel = RusshChannel;

    fn addr(&self) -> &str {
        Connection::addr(self)
    }

    async fn open_session(&self) -> Result<Session<RusshChannel>> {
        Connection::open_session(self).await
    }

    async fn close(&self) -> Result<()> {
        Connection::close(self).await
    }
}
