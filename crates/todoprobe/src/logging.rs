//! Subscriber setup shared by the CLI and the acceptance tests.

use crate::result::{ProbeError, ProbeResult};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output shape of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Default directive for a `-v` count: 0 is info, 1 debug, 2+ trace
#[must_use]
pub const fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "info,todoprobe=debug",
        _ => "debug,todoprobe=trace",
    }
}

/// Install the global subscriber on stderr.
///
/// `RUST_LOG` wins over `verbosity` when set.
///
/// # Errors
///
/// Returns [`ProbeError::InvalidConfig`] if a subscriber is already installed.
pub fn init(verbosity: u8, format: LogFormat) -> ProbeResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| ProbeError::InvalidConfig {
        message: format!("logging already initialized: {e}"),
    })
}
