//! Browser kinds and launch/context options.
//!
//! The concrete backend (see `cdp`) turns these into a running browser; the
//! lifecycle manager only builds them from the resolved profiles.

use crate::config::{BrowserProfile, EnvironmentProfile, Viewport};
use crate::result::{ProbeError, ProbeResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Arguments passed to every Chromium launch
pub const CHROMIUM_ARGS: &[&str] = &[
    "--disable-features=Translate",
    "--disable-translate",
    "--disable-blink-features=AutomationControlled",
    "--lang=en-US",
];

/// Locale applied to every context
pub const DEFAULT_LOCALE: &str = "en-US";

/// `Accept-Language` sent by every context
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en";

/// Browser engine to launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BrowserKind {
    /// Chromium, Chrome or Edge
    #[default]
    Chromium,
    /// Firefox
    Firefox,
    /// WebKit
    Webkit,
}

impl BrowserKind {
    /// All kinds, in declaration order
    pub const ALL: [Self; 3] = [Self::Chromium, Self::Firefox, Self::Webkit];

    /// Canonical lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        }
    }

    /// Whether the engine speaks the Chrome DevTools Protocol
    #[must_use]
    pub const fn speaks_cdp(self) -> bool {
        match self {
            Self::Chromium => true,
            Self::Firefox | Self::Webkit => false,
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Self::Chromium),
            "firefox" => Ok(Self::Firefox),
            "webkit" => Ok(Self::Webkit),
            other => Err(ProbeError::InvalidConfig {
                message: format!(
                    "unknown browser kind \"{other}\" (expected chromium, firefox or webkit)"
                ),
            }),
        }
    }
}

/// Options for launching a browser process
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Release channel from the browser profile
    pub channel: Option<String>,
    /// Initial window size
    pub viewport: Viewport,
    /// Extra command-line arguments
    pub args: Vec<String>,
    /// Disable the sandbox (containers/CI)
    pub sandbox: bool,
    /// Time allowed for the process to start and for each protocol request
    pub launch_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            channel: None,
            viewport: Viewport::default(),
            args: CHROMIUM_ARGS.iter().map(ToString::to_string).collect(),
            sandbox: true,
            launch_timeout: Duration::from_secs(30),
        }
    }
}

impl LaunchOptions {
    /// Build launch options from a browser profile
    #[must_use]
    pub fn from_profile(profile: &BrowserProfile, headless: bool) -> Self {
        Self {
            headless,
            channel: profile.channel.clone(),
            viewport: profile.viewport,
            ..Self::default()
        }
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the launch timeout
    #[must_use]
    pub const fn with_launch_timeout(mut self, timeout: Duration) -> Self {
        self.launch_timeout = timeout;
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Add a command-line argument
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Options for one isolated browsing context
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Page viewport
    pub viewport: Viewport,
    /// Locale reported by the page
    pub locale: String,
    /// `Accept-Language` header value
    pub accept_language: String,
    /// Base URL relative navigations resolve against
    pub base_url: String,
    /// Directory videos are written into; `None` disables recording
    pub record_video_dir: Option<PathBuf>,
    /// Default timeout for page operations
    pub default_timeout: Duration,
    /// Delay inserted before each action
    pub slow_mo: Option<Duration>,
}

impl ContextOptions {
    /// Build context options from the selected profiles
    #[must_use]
    pub fn from_profiles(env: &EnvironmentProfile, browser: &BrowserProfile) -> Self {
        Self {
            viewport: browser.viewport,
            locale: DEFAULT_LOCALE.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            base_url: env.base_url.clone(),
            record_video_dir: None,
            default_timeout: env.timeout(),
            slow_mo: env.slow_mo(),
        }
    }

    /// Record video into `dir`
    #[must_use]
    pub fn with_video_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.record_video_dir = Some(dir.into());
        self
    }

    /// Resolve `url` against the base URL.
    ///
    /// Absolute URLs pass through; `/path` and `path` are appended to the base.
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        join_url(&self.base_url, url)
    }
}

/// Join `url` onto `base` unless it is already absolute
#[must_use]
pub fn join_url(base: &str, url: &str) -> String {
    if url.contains("://") || url.starts_with("about:") || url.starts_with("data:") {
        return url.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = url.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Map a release channel to a browser executable.
///
/// `None`, `chrome` and `chromium` use the backend's own lookup. `msedge*`
/// searches the usual Edge binaries on `PATH`. Anything else is taken as an
/// explicit executable path.
///
/// # Errors
///
/// Returns [`ProbeError::BrowserLaunch`] when the channel cannot be located.
pub fn resolve_channel(channel: Option<&str>) -> ProbeResult<Option<PathBuf>> {
    let Some(channel) = channel else {
        return Ok(None);
    };
    match channel {
        "chrome" | "chromium" | "chrome-stable" => Ok(None),
        edge if edge.starts_with("msedge") => {
            const EDGE_BINARIES: &[&str] = &["microsoft-edge", "microsoft-edge-stable", "msedge"];
            EDGE_BINARIES
                .iter()
                .find_map(|bin| find_on_path(bin))
                .or_else(|| {
                    let fixed = Path::new("/opt/microsoft/msedge/msedge");
                    fixed.exists().then(|| fixed.to_path_buf())
                })
                .map(Some)
                .ok_or_else(|| ProbeError::BrowserLaunch {
                    message: format!("channel \"{channel}\" requested but Microsoft Edge was not found"),
                })
        }
        path if Path::new(path).exists() => Ok(Some(PathBuf::from(path))),
        other => Err(ProbeError::BrowserLaunch {
            message: format!("unknown browser channel \"{other}\""),
        }),
    }
}

fn find_on_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}
