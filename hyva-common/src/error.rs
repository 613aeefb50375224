//! Common error types for HYVA

use thiserror::Error;

/// Common result type for HYVA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the HYVA client
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure: connection refused, dropped mid-stream,
    /// malformed frame, or idle stall. Contained inside the stream session
    /// and converted into a locally simulated result; never surfaced to
    /// callers as an error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server explicitly rejected or aborted the job via a `failed` event.
    /// Surfaced verbatim; no fallback substitution.
    #[error("Server reported failure: {0}")]
    Server(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Transport(format!("malformed frame: {}", e))
    }
}
