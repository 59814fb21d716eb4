// ABOUTME: Configuration types and loading for panda's config.yml.
// ABOUTME: Resolves per-server connection settings and credentials.

mod deserialize;
mod init;
mod server;

pub use init::{DEFAULT_BRANCHES_SCRIPT, DEFAULT_PATHS_SCRIPT, generate_template_yaml, init_config};
pub use server::ServerConfig;

use crate::error::{Error, Result};
use crate::ssh::{ConnectionConfig, Credential, DEFAULT_PORT};
use deserialize::deserialize_servers;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "PANDA_CONFIG";
pub const CONFIG_DIR: &str = ".config/panda";
pub const CONFIG_FILENAME: &str = "config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_servers")]
    pub servers: NonEmpty<ServerConfig>,

    #[serde(default = "default_port")]
    pub default_port: u16,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub identity_file: Option<PathBuf>,

    #[serde(default)]
    pub known_hosts: Option<PathBuf>,

    /// Connect timeout and captured-command timeout.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_select_cmd")]
    pub select_cmd: String,

    #[serde(default = "default_tail_cmd")]
    pub tail_cmd: String,

    /// Remote log path with `%s` placeholders for the record name.
    #[serde(default = "default_log_path_format")]
    pub log_path_format: String,

    #[serde(default)]
    pub scripts: Scripts,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

/// Inventory-listing commands run on the remote host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scripts {
    #[serde(default)]
    pub paths: String,
    #[serde(default)]
    pub branches: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_select_cmd() -> String {
    "fzf".to_string()
}

fn default_tail_cmd() -> String {
    "tail -f".to_string()
}

fn default_log_path_format() -> String {
    "/var/www/vhosts/%s/log/%s-app_error_log".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the config at `path`, writing the template first if it is missing.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            init_config(path, &local_user())?;
        }
        Self::load(path)
    }

    /// `$PANDA_CONFIG`, or `$HOME/.config/panda/config.yml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let home = std::env::var("HOME")
            .map_err(|_| Error::InvalidConfig("HOME is not set".to_string()))?;
        Ok(Path::new(&home).join(CONFIG_DIR).join(CONFIG_FILENAME))
    }

    fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// Pick a server by name or host; the first server when `name` is None.
    pub fn server(&self, name: Option<&str>) -> Result<&ServerConfig> {
        match name {
            None => Ok(self.servers.first()),
            Some(name) => self
                .servers
                .iter()
                .find(|s| s.matches(name))
                .ok_or_else(|| Error::UnknownServer(name.to_string())),
        }
    }

    /// The named server only, or every server when `name` is None.
    pub fn select_servers(&self, name: Option<&str>) -> Result<Vec<&ServerConfig>> {
        match name {
            Some(_) => Ok(vec![self.server(name)?]),
            None => Ok(self.servers.iter().collect()),
        }
    }

    pub fn user_for(&self, server: &ServerConfig) -> String {
        server
            .user
            .clone()
            .or_else(|| self.user.clone())
            .unwrap_or_else(local_user)
    }

    pub fn connection_config(&self, server: &ServerConfig) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(server.address(), self.user_for(server))
            .connect_timeout(self.timeout)
            .default_port(self.default_port)
            .trust_on_first_use(server.trust_first_connection);
        if let Some(path) = &self.known_hosts {
            config = config.known_hosts_path(expand_home(path));
        }
        config
    }

    /// Password when the server has one, otherwise its (or the global) key file.
    pub fn credential(&self, server: &ServerConfig) -> Credential {
        if let Some(password) = &server.password {
            return Credential::Password(password.clone());
        }
        let key = server
            .identity_file
            .as_ref()
            .or(self.identity_file.as_ref())
            .map(|p| expand_home(p))
            .unwrap_or_else(|| expand_home(Path::new("~/.ssh/id_rsa")));
        Credential::PrivateKeyFile(key)
    }
}

/// `$USER`, or `root` when unset.
pub fn local_user() -> String {
    std::env::var("USER").unwrap_or_else(|_| "root".to_string())
}

/// Expand a leading `~/` to `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var("HOME")) {
        (Ok(rest), Ok(home)) => Path::new(&home).join(rest),
        _ => path.to_path_buf(),
    }
}
