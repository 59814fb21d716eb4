// ABOUTME: Server configuration for SSH connections.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@host:port".

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    /// Explicit port; falls back to the config-wide `default_port`.
    #[serde(default)]
    pub port: Option<u16>,
    /// Short name used to pick this server and to label its output.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
}

fn default_trust_first_connection() -> bool {
    true
}

impl ServerConfig {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port]
        let (user_part, rest) = match s.split_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, s),
        };

        if user_part.is_some_and(str::is_empty) {
            return Err("username cannot be empty".to_string());
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) if !host.contains(':') => {
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {}", port_str))?;
                (host, Some(port))
            }
            _ => (rest, None),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(ServerConfig {
            host: host.to_string(),
            port,
            name: None,
            user: user_part.map(|s| s.to_string()),
            identity_file: None,
            password: None,
            trust_first_connection: true,
        })
    }

    /// Check a server given as a mapping.
    pub fn validated(self) -> Result<Self, String> {
        if self.host.trim().is_empty() {
            return Err("hostname cannot be empty".to_string());
        }
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err("name cannot be empty".to_string());
        }
        if self.user.as_deref().is_some_and(str::is_empty) {
            return Err("username cannot be empty".to_string());
        }
        Ok(self)
    }

    /// Name shown next to this server's output.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.host)
    }

    /// Whether `name` refers to this server, by label or host.
    pub fn matches(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name) || self.host == name
    }

    /// Host with the explicit port appended, if one was configured.
    pub fn address(&self) -> String {
        match self.port {
            Some(port) if self.host.contains(':') => format!("[{}]:{}", self.host, port),
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}
