//! Error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    #[error("Remote execution error: {0}")]
    RemoteExecution(String),

    #[error("Command timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<russh::Error> for Error {
    fn from(err: russh::Error) -> Self {
        Error::RemoteExecution(err.to_string())
    }
}

/// Failure to establish a session.
///
/// Displays as a single line prefixed with `ERROR:` so interactive callers can
/// print it verbatim and decide whether to abort or skip the cluster.
#[derive(Debug, Error)]
#[error("ERROR: {0}")]
pub struct ConnectError(pub String);

impl ConnectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
