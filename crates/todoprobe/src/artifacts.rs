//! Results directory tree and failure artifacts.
//!
//! ```text
//! test-results/
//! ├── cucumber-report.json
//! ├── cucumber-report.html
//! ├── screenshots/failure-<epoch-ms>.png
//! ├── videos/<scenario>_<timestamp>.webm
//! └── attachments/<scenario>_<timestamp>.json
//! ```

use crate::result::{ProbeError, ProbeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default results root, relative to the working directory
pub const DEFAULT_RESULTS_DIR: &str = "test-results";

/// Maximum length of a sanitized scenario name
pub const MAX_NAME_LEN: usize = 50;

/// Layout of the results directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsLayout {
    root: PathBuf,
}

impl Default for ResultsLayout {
    fn default() -> Self {
        Self::new(DEFAULT_RESULTS_DIR)
    }
}

impl ResultsLayout {
    /// Layout rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Failure screenshots
    #[must_use]
    pub fn screenshots(&self) -> PathBuf {
        self.root.join("screenshots")
    }

    /// Recorded videos
    #[must_use]
    pub fn videos(&self) -> PathBuf {
        self.root.join("videos")
    }

    /// Failure bundles
    #[must_use]
    pub fn attachments(&self) -> PathBuf {
        self.root.join("attachments")
    }

    /// Cucumber JSON output
    #[must_use]
    pub fn json_report(&self) -> PathBuf {
        self.root.join("cucumber-report.json")
    }

    /// HTML report
    #[must_use]
    pub fn html_report(&self) -> PathBuf {
        self.root.join("cucumber-report.html")
    }

    /// Create every directory of the tree.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a directory cannot be created.
    pub fn ensure(&self) -> ProbeResult<()> {
        for dir in [self.screenshots(), self.videos(), self.attachments()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Turn a scenario name into a filename stem.
///
/// Drops every character outside ASCII letters, digits, whitespace and `-`,
/// collapses whitespace runs into `_`, then keeps the first 50 characters.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    let mut out = String::with_capacity(kept.len());
    let mut in_space = false;
    for c in kept.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out.chars().take(MAX_NAME_LEN).collect()
}

/// Second-granularity UTC timestamp safe for filenames: `YYYY-MM-DDTHH-MM-SS`
#[must_use]
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// `<sanitized>_<timestamp>.<extension>`
#[must_use]
pub fn artifact_file_name(scenario: &str, at: DateTime<Utc>, extension: &str) -> String {
    format!("{}_{}.{extension}", sanitize_name(scenario), file_timestamp(at))
}

/// Lines of an error message that look like stack frames
#[must_use]
pub fn stack_lines(message: &str) -> Vec<String> {
    message
        .lines()
        .filter(|line| line.contains("at "))
        .map(|line| line.trim().to_string())
        .collect()
}

/// Write a failure screenshot as `screenshots/failure-<epoch-ms>.png`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written.
pub fn save_screenshot(layout: &ResultsLayout, png: &[u8], at: DateTime<Utc>) -> ProbeResult<PathBuf> {
    let dir = layout.screenshots();
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("failure-{}.png", at.timestamp_millis()));
    std::fs::write(&path, png)?;
    Ok(path)
}

/// Move a finished video next to itself under its scenario-derived name.
///
/// # Errors
///
/// Returns an I/O error if the rename fails.
pub fn rename_video(original: &Path, scenario: &str, at: DateTime<Utc>) -> ProbeResult<PathBuf> {
    let dir = original.parent().unwrap_or_else(|| Path::new("."));
    let target = dir.join(artifact_file_name(scenario, at, "webm"));
    std::fs::rename(original, &target)?;
    Ok(target)
}

/// Everything captured for one failed scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureBundle {
    /// Scenario name
    pub scenario: String,
    /// Feature file path
    pub feature: String,
    /// Line of the scenario in the feature file
    pub line: usize,
    /// Tags, with their `@`
    pub tags: Vec<String>,
    /// Scenario duration in seconds
    pub duration_secs: f64,
    /// When the failure was recorded
    pub timestamp: DateTime<Utc>,
    /// Failure message
    pub error: Option<String>,
    /// Stack-like lines of the failure message
    #[serde(default)]
    pub stack: Vec<String>,
    /// Screenshot, if captured
    pub screenshot: Option<PathBuf>,
    /// Renamed video, if recorded
    pub video: Option<PathBuf>,
}

impl FailureBundle {
    /// Start a bundle for a failed scenario
    #[must_use]
    pub fn new(
        scenario: impl Into<String>,
        feature: impl Into<String>,
        line: usize,
        tags: Vec<String>,
        duration: Duration,
        timestamp: DateTime<Utc>,
        error: Option<String>,
    ) -> Self {
        let stack = error.as_deref().map(stack_lines).unwrap_or_default();
        Self {
            scenario: scenario.into(),
            feature: feature.into(),
            line,
            tags,
            duration_secs: duration.as_secs_f64(),
            timestamp,
            error,
            stack,
            screenshot: None,
            video: None,
        }
    }

    /// Human-readable failure summary
    #[must_use]
    pub fn summary(&self) -> String {
        let rule = "-".repeat(48);
        let tags = if self.tags.is_empty() {
            "No tags".to_string()
        } else {
            self.tags.join(", ")
        };
        let mut text = format!(
            "FAILURE INFORMATION:\n{rule}\nScenario: {}\nFeature: {}:{}\nTags: {tags}\nDuration: {:.2}s\nDate: {}\n",
            self.scenario,
            self.feature,
            self.line,
            self.duration_secs,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        if let Some(error) = &self.error {
            text.push_str(&format!("Error: {error}\n"));
        }
        if !self.stack.is_empty() {
            text.push_str("Stack trace:\n");
            for line in &self.stack {
                text.push_str(&format!("  {line}\n"));
            }
        }
        if let Some(path) = &self.screenshot {
            text.push_str(&format!("Screenshot: {}\n", path.display()));
        }
        if let Some(path) = &self.video {
            text.push_str(&format!("Video: {}\n", path.display()));
        }
        text.push_str(&rule);
        text
    }

    /// Persist under `attachments/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be serialized or written.
    pub fn save(&self, layout: &ResultsLayout) -> ProbeResult<PathBuf> {
        let dir = layout.attachments();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(artifact_file_name(&self.scenario, self.timestamp, "json"));
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }

    /// Load every bundle under `attachments/`, oldest first.
    ///
    /// A missing directory yields no bundles. Unreadable files are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory exists but cannot be listed.
    pub fn load_all(layout: &ResultsLayout) -> ProbeResult<Vec<Self>> {
        let dir = layout.attachments();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut bundles = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read(&path)
                .map_err(ProbeError::from)
                .and_then(|raw| serde_json::from_slice::<Self>(&raw).map_err(Into::into))
            {
                Ok(bundle) => bundles.push(bundle),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable failure bundle"),
            }
        }
        bundles.sort_by_key(|b| b.timestamp);
        Ok(bundles)
    }
}
