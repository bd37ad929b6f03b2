//! Error types for the command-line front end.

use std::path::PathBuf;

use tachibana::Status;

/// All errors that can end a command.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Api(#[from] tachibana::Error),

    /// The broker answered with a non-zero result code.
    #[error("rejected by broker: {0}")]
    Rejected(Status),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
