//! Error types for the CLI

use thiserror::Error;
use todoprobe::ProbeError;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// todoprobe library error
    #[error("{0}")]
    Probe(#[from] ProbeError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// The binary was built without a browser backend
    #[error("No browser backend: rebuild with the `browser` feature")]
    NoBackend,
}

impl CliError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Process exit code: 2 for configuration problems, 1 for everything else
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Probe(e) if e.is_configuration() => 2,
            Self::InvalidArgument { .. } | Self::NoBackend => 2,
            _ => 1,
        }
    }
}
