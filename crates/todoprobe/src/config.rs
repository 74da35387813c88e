//! Configuration provider.
//!
//! Loads `test.config.json`, resolves named environment and browser profiles,
//! and applies the process-level overrides (`TEST_ENV`, `BROWSER`, `HEADLESS`,
//! `RECORD_VIDEO`, `BROWSER_KIND`).
//!
//! The loaded [`TestConfiguration`] is immutable. It is built once before any
//! scenario starts and shared read-only (behind `Arc`) by every worker.

use crate::browser::BrowserKind;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "test.config.json";

/// Environment-name override variable
pub const ENV_TEST_ENV: &str = "TEST_ENV";
/// Browser-profile override variable
pub const ENV_BROWSER: &str = "BROWSER";
/// Headless override variable (`"false"` forces a headed browser)
pub const ENV_HEADLESS: &str = "HEADLESS";
/// Video recording toggle (`"true"` enables recording)
pub const ENV_RECORD_VIDEO: &str = "RECORD_VIDEO";
/// Browser kind selection (`chromium`, `firefox`, `webkit`)
pub const ENV_BROWSER_KIND: &str = "BROWSER_KIND";

/// A named target environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentProfile {
    /// Display name
    pub name: String,
    /// Base URL every relative navigation is resolved against
    pub base_url: String,
    /// Default interaction timeout in milliseconds
    pub timeout: u64,
    /// Artificial delay before each browser action, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_mo: Option<u64>,
}

impl EnvironmentProfile {
    /// Default interaction timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Slow-motion delay, if configured and non-zero
    #[must_use]
    pub fn slow_mo(&self) -> Option<Duration> {
        self.slow_mo
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// A named browser variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserProfile {
    /// Release channel (`chrome`, `msedge`, ...). `None` uses the bundled binary lookup.
    #[serde(default)]
    pub channel: Option<String>,
    /// Run without a visible window
    pub headless: bool,
    /// Viewport dimensions
    pub viewport: Viewport,
}

/// Profiles used when nothing else selects one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSelection {
    /// Default environment name
    pub environment: String,
    /// Default browser profile name
    pub browser: String,
}

/// The complete contents of `test.config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfiguration {
    /// Environments by name
    pub environments: BTreeMap<String, EnvironmentProfile>,
    /// Browser profiles by name
    pub browsers: BTreeMap<String, BrowserProfile>,
    /// Default selection
    #[serde(rename = "default")]
    pub defaults: DefaultSelection,
}

impl TestConfiguration {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] if the file cannot be read or parsed,
    /// and [`ProbeError::InvalidConfig`] if it fails validation.
    pub fn load(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ProbeError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| ProbeError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            environments = config.environments.len(),
            browsers = config.browsers.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> ProbeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.environments.is_empty() {
            return Err(invalid("no environments defined"));
        }
        if self.browsers.is_empty() {
            return Err(invalid("no browsers defined"));
        }
        if !self.environments.contains_key(&self.defaults.environment) {
            return Err(invalid(format!(
                "default environment \"{}\" is not defined",
                self.defaults.environment
            )));
        }
        if !self.browsers.contains_key(&self.defaults.browser) {
            return Err(invalid(format!(
                "default browser \"{}\" is not defined",
                self.defaults.browser
            )));
        }
        for (key, env) in &self.environments {
            if env.timeout == 0 {
                return Err(invalid(format!("environment \"{key}\" has a zero timeout")));
            }
            if env.base_url.trim().is_empty() {
                return Err(invalid(format!("environment \"{key}\" has an empty baseUrl")));
            }
        }
        for (key, browser) in &self.browsers {
            if browser.viewport.width == 0 || browser.viewport.height == 0 {
                return Err(invalid(format!("browser \"{key}\" has an empty viewport")));
            }
        }
        Ok(())
    }

    /// Resolve an environment profile: `name` if given, otherwise the default.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::UnknownProfile`] naming the available environments.
    pub fn environment(&self, name: Option<&str>) -> ProbeResult<&EnvironmentProfile> {
        let name = name.unwrap_or(&self.defaults.environment);
        self.environments
            .get(name)
            .ok_or_else(|| ProbeError::UnknownProfile {
                kind: "Environment",
                kind_plural: "environments",
                name: name.to_string(),
                available: self.available_environments(),
            })
    }

    /// Resolve a browser profile: `name` if given, otherwise the default.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::UnknownProfile`] naming the available browsers.
    pub fn browser(&self, name: Option<&str>) -> ProbeResult<&BrowserProfile> {
        let name = name.unwrap_or(&self.defaults.browser);
        self.browsers
            .get(name)
            .ok_or_else(|| ProbeError::UnknownProfile {
                kind: "Browser",
                kind_plural: "browsers",
                name: name.to_string(),
                available: self.available_browsers(),
            })
    }

    /// Names of all environments
    #[must_use]
    pub fn available_environments(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    /// Names of all browser profiles
    #[must_use]
    pub fn available_browsers(&self) -> Vec<String> {
        self.browsers.keys().cloned().collect()
    }
}

fn invalid(message: impl Into<String>) -> ProbeError {
    ProbeError::InvalidConfig {
        message: message.into(),
    }
}

/// Process-level overrides. All optional; profile values are the fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Environment name (`TEST_ENV`)
    pub environment: Option<String>,
    /// Browser profile name (`BROWSER`)
    pub browser: Option<String>,
    /// Raw headless flag (`HEADLESS`)
    pub headless: Option<String>,
    /// Raw video toggle (`RECORD_VIDEO`)
    pub record_video: Option<String>,
    /// Raw browser kind (`BROWSER_KIND`)
    pub browser_kind: Option<String>,
}

impl Overrides {
    /// Read overrides from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary lookup (used by tests and the CLI)
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            environment: non_empty(ENV_TEST_ENV),
            browser: non_empty(ENV_BROWSER),
            headless: non_empty(ENV_HEADLESS),
            record_video: non_empty(ENV_RECORD_VIDEO),
            browser_kind: non_empty(ENV_BROWSER_KIND),
        }
    }

    /// Headless flag after applying the override: only `"false"` changes the profile value
    #[must_use]
    pub fn headless(&self, profile_default: bool) -> bool {
        match self.headless.as_deref() {
            Some("false") => false,
            _ => profile_default,
        }
    }

    /// Whether video recording is switched on
    #[must_use]
    pub fn record_video(&self) -> bool {
        self.record_video.as_deref() == Some("true")
    }
}

/// Profiles and switches resolved once for a whole run
#[derive(Debug, Clone)]
pub struct RunSettings {
    config: Arc<TestConfiguration>,
    /// Selected environment name
    pub environment_name: String,
    /// Selected browser profile name
    pub browser_name: String,
    /// Browser kind to launch
    pub browser_kind: BrowserKind,
    /// Effective headless flag
    pub headless: bool,
    /// Whether contexts record video
    pub record_video: bool,
}

impl RunSettings {
    /// Resolve every selection against the configuration.
    ///
    /// # Errors
    ///
    /// Fails fast on unknown profile names or an unknown browser kind.
    pub fn resolve(config: Arc<TestConfiguration>, overrides: &Overrides) -> ProbeResult<Self> {
        let environment_name = overrides
            .environment
            .clone()
            .unwrap_or_else(|| config.defaults.environment.clone());
        let browser_name = overrides
            .browser
            .clone()
            .unwrap_or_else(|| config.defaults.browser.clone());

        // Resolve now so an unknown name aborts the run before any scenario starts
        let _ = config.environment(Some(&environment_name))?;
        let profile_headless = config.browser(Some(&browser_name))?.headless;

        let browser_kind = match overrides.browser_kind.as_deref() {
            Some(raw) => raw.parse()?,
            None => BrowserKind::default(),
        };

        Ok(Self {
            headless: overrides.headless(profile_headless),
            record_video: overrides.record_video(),
            config,
            environment_name,
            browser_name,
            browser_kind,
        })
    }

    /// The loaded configuration
    #[must_use]
    pub fn config(&self) -> &TestConfiguration {
        &self.config
    }

    /// The selected environment profile.
    ///
    /// # Errors
    ///
    /// Only fails if the settings were built against a different configuration.
    pub fn environment(&self) -> ProbeResult<&EnvironmentProfile> {
        self.config.environment(Some(&self.environment_name))
    }

    /// The selected browser profile.
    ///
    /// # Errors
    ///
    /// Only fails if the settings were built against a different configuration.
    pub fn browser(&self) -> ProbeResult<&BrowserProfile> {
        self.config.browser(Some(&self.browser_name))
    }
}
