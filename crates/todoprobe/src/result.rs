//! Result and error types for todoprobe.

use thiserror::Error;

/// Result type for todoprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while configuring, driving or reporting a run
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Configuration file missing or unreadable
    #[error("Could not load configuration file: {path}: {message}")]
    Config {
        /// Path of the configuration file
        path: String,
        /// Error message
        message: String,
    },

    /// Named profile absent from the configuration
    #[error("{kind} \"{name}\" not found. Available {kind_plural}: {}", available.join(", "))]
    UnknownProfile {
        /// Profile kind ("Environment" or "Browser")
        kind: &'static str,
        /// Plural used in the message ("environments" or "browsers")
        kind_plural: &'static str,
        /// Requested name
        name: String,
        /// Names present in the configuration
        available: Vec<String>,
    },

    /// Configuration parsed but violates an invariant
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Browser kind has no launch strategy in the active backend
    #[error("Browser kind '{kind}' is not supported by the {backend} backend")]
    UnsupportedBrowser {
        /// Requested browser kind
        kind: String,
        /// Backend name
        backend: &'static str,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Browsing context error
    #[error("Browser context error: {message}")]
    Context {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// No element matched a locator
    #[error("No element matches {locator}")]
    ElementNotFound {
        /// Human-readable locator
        locator: String,
    },

    /// Operation timed out
    #[error("{operation} timed out after {ms}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Video recording error
    #[error("Video recording failed: {message}")]
    Video {
        /// Error message
        message: String,
    },

    /// Operation called in the wrong lifecycle state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Step vocabulary is inconsistent
    #[error("Step vocabulary error: {message}")]
    StepVocabulary {
        /// Error message
        message: String,
    },

    /// Report generation error
    #[error("Report generation failed: {message}")]
    Report {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration class (fatal before any scenario runs)
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::UnknownProfile { .. }
                | Self::InvalidConfig { .. }
                | Self::StepVocabulary { .. }
        )
    }
}
