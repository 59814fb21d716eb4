// ABOUTME: Per-server warnings collected while a command talks to QA servers.
// ABOUTME: Failures that skip one server without failing the whole command end up here.

use std::fmt;

/// Non-fatal problems met while working through the selected servers.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning and log it against its server.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(server = %warning.server, kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Labels of the servers that were skipped because listing them failed.
    pub fn skipped_servers(&self) -> impl Iterator<Item = &str> {
        self.warnings
            .iter()
            .filter(|w| w.kind == WarningKind::DiscoveryFailed)
            .map(|w| w.server.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    /// Label of the server the warning is about.
    pub server: String,
    pub message: String,
}

impl Warning {
    /// The connection to `server` could not be shut down cleanly.
    pub fn ssh_disconnect(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            server: server.into(),
            message: message.into(),
        }
    }

    /// The inventory of `server` could not be listed; it was left out.
    pub fn discovery_failed(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DiscoveryFailed,
            server: server.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WarningKind::SshDisconnect => {
                write!(f, "{}: disconnect failed: {}", self.server, self.message)
            }
            WarningKind::DiscoveryFailed => {
                write!(f, "{}: skipped, listing failed: {}", self.server, self.message)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    SshDisconnect,
    DiscoveryFailed,
}
