// ABOUTME: Application-wide error types for panda.
// ABOUTME: Wraps SSH and inventory failures alongside config and selection errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown server: {0}")]
    UnknownServer(String),

    #[error("nothing selected")]
    NoSelection,

    #[error("tail_cmd is empty; set it in the config file")]
    MissingTailCommand,

    #[error("command on {host} exited with status {exit_status}")]
    CommandFailed { host: String, exit_status: i32 },

    #[error("selection filter failed: {0}")]
    FilterFailed(String),

    #[error(transparent)]
    Ssh(#[from] crate::ssh::Error),

    #[error(transparent)]
    Inventory(#[from] crate::inventory::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
