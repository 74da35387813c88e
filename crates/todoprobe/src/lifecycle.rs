//! Scenario lifecycle manager.
//!
//! Owns the browser, context and page of exactly one scenario:
//!
//! ```text
//! Uninitialized ──begin──▶ Active ──end──▶ TornDown
//!        │                                ▲
//!        └──begin fails──▶ Aborted ──end──┘
//! ```
//!
//! `end` releases the context before the browser so a recording is flushed
//! before the process exits. For a failed scenario it also captures a
//! full-page screenshot (while the page is still alive), renames the video
//! and persists a [`FailureBundle`]. Artifact errors are logged and never stop
//! the release. A scenario whose setup failed still gets a bundle carrying
//! only its summary.

use crate::artifacts::{self, FailureBundle, ResultsLayout};
use crate::browser::{BrowserKind, ContextOptions, LaunchOptions};
use crate::config::RunSettings;
use crate::driver::{BrowserSession, ContextSession, Launcher};
use crate::page::{Interactions, PageObject};
use crate::result::{ProbeError, ProbeResult};
use crate::todo_page::TodoPage;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Final status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStatus {
    /// Every step passed
    Passed,
    /// A step or hook failed
    Failed,
    /// The scenario was skipped
    Skipped,
}

/// What the runner knows about a finished scenario
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    /// Scenario name
    pub name: String,
    /// Feature file path
    pub feature: String,
    /// Line of the scenario
    pub line: usize,
    /// Tags, with their `@`
    pub tags: Vec<String>,
    /// Status
    pub status: ScenarioStatus,
    /// Failure message
    pub error: Option<String>,
    /// Wall-clock duration
    pub duration: Duration,
}

impl ScenarioOutcome {
    /// Whether the scenario failed
    #[must_use]
    pub fn failed(&self) -> bool {
        self.status == ScenarioStatus::Failed
    }
}

struct ActiveScenario {
    browser: Box<dyn BrowserSession>,
    context: Box<dyn ContextSession>,
    page: TodoPage,
}

enum State {
    Uninitialized,
    Active(Box<ActiveScenario>),
    Aborted,
    TornDown,
}

/// Per-scenario owner of browser resources
pub struct ScenarioLifecycle {
    launcher: Arc<dyn Launcher>,
    settings: Arc<RunSettings>,
    layout: ResultsLayout,
    state: State,
}

impl fmt::Debug for ScenarioLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioLifecycle")
            .field("launcher", &self.launcher.name())
            .field("state", &self.state_name())
            .field("results", &self.layout.root())
            .finish()
    }
}

impl ScenarioLifecycle {
    /// Create a fresh manager
    #[must_use]
    pub fn new(launcher: Arc<dyn Launcher>, settings: Arc<RunSettings>, layout: ResultsLayout) -> Self {
        Self {
            launcher,
            settings,
            layout,
            state: State::Uninitialized,
        }
    }

    /// `"uninitialized"`, `"active"`, `"aborted"` or `"torn-down"`
    #[must_use]
    pub const fn state_name(&self) -> &'static str {
        match self.state {
            State::Uninitialized => "uninitialized",
            State::Active(_) => "active",
            State::Aborted => "aborted",
            State::TornDown => "torn-down",
        }
    }

    /// Whether resources are held
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    /// The page object of the active scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidState`] outside the active state.
    pub fn page(&self) -> ProbeResult<&TodoPage> {
        match &self.state {
            State::Active(active) => Ok(&active.page),
            _ => Err(ProbeError::invalid_state(format!(
                "page is not available ({})",
                self.state_name()
            ))),
        }
    }

    /// Acquire a browser, an isolated context and a page.
    ///
    /// If the context or page cannot be opened the browser is released before
    /// the error is returned. Any failure leaves the manager aborted.
    ///
    /// # Errors
    ///
    /// Propagates profile resolution and launch errors. Calling `begin` twice
    /// is an [`ProbeError::InvalidState`] error.
    pub async fn begin(&mut self, kind: BrowserKind) -> ProbeResult<()> {
        if !matches!(self.state, State::Uninitialized) {
            return Err(ProbeError::invalid_state(format!(
                "begin called on a {} scenario",
                self.state_name()
            )));
        }
        self.state = State::Aborted;

        let environment = self.settings.environment()?;
        let profile = self.settings.browser()?;

        let launch = LaunchOptions::from_profile(profile, self.settings.headless);
        let mut context_options = ContextOptions::from_profiles(environment, profile);
        if self.settings.record_video {
            let dir = self.layout.videos();
            std::fs::create_dir_all(&dir)?;
            context_options = context_options.with_video_dir(dir);
        }

        debug!(
            backend = self.launcher.name(),
            %kind,
            headless = launch.headless,
            environment = %environment.name,
            "launching browser"
        );
        let browser = self.launcher.launch(kind, &launch).await?;

        let context = match browser.new_context(&context_options).await {
            Ok(context) => context,
            Err(e) => {
                close_browser(browser.as_ref()).await;
                return Err(e);
            }
        };

        let page = match context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                close_context(context.as_ref()).await;
                close_browser(browser.as_ref()).await;
                return Err(e);
            }
        };

        let page = TodoPage::new(Interactions::new(page, &context_options));
        self.state = State::Active(Box::new(ActiveScenario {
            browser,
            context,
            page,
        }));
        Ok(())
    }

    /// Release everything and capture failure artifacts.
    ///
    /// Returns the failure bundle of a failed scenario. After a failed `begin`
    /// only the bundle is written; in any other state `end` does nothing.
    pub async fn end(&mut self, outcome: &ScenarioOutcome) -> Option<FailureBundle> {
        let active = match std::mem::replace(&mut self.state, State::TornDown) {
            State::Active(active) => active,
            State::Aborted => return self.end_aborted(outcome),
            State::Uninitialized => {
                self.state = State::Uninitialized;
                return None;
            }
            State::TornDown => return None,
        };
        let ActiveScenario {
            browser,
            context,
            page,
        } = *active;

        let now = Utc::now();
        let mut bundle = failure_bundle(outcome, now);

        if let Some(bundle) = bundle.as_mut() {
            if let Some(error) = &outcome.error {
                error!(scenario = %outcome.name, "ERROR: {error}");
            }
            match page.interactions().screenshot(true).await {
                Ok(png) => match artifacts::save_screenshot(&self.layout, &png, now) {
                    Ok(path) => {
                        info!(path = %path.display(), "Screenshot saved");
                        bundle.screenshot = Some(path);
                    }
                    Err(e) => error!(error = %e, "Error saving screenshot"),
                },
                Err(e) => error!(error = %e, "Error capturing screenshot"),
            }
        }

        let video = context.video_path();
        drop(page);
        close_context(context.as_ref()).await;

        match video {
            Some(original) if original.exists() => {
                match artifacts::rename_video(&original, &outcome.name, now) {
                    Ok(path) => {
                        info!(path = %path.display(), "Video saved");
                        if let Some(bundle) = bundle.as_mut() {
                            bundle.video = Some(path);
                        }
                    }
                    Err(e) => error!(error = %e, path = %original.display(), "Error processing video"),
                }
            }
            Some(original) => debug!(path = %original.display(), "video file was not produced"),
            None if self.settings.record_video => debug!("recording requested but no video path"),
            None => {}
        }

        if let Some(bundle) = bundle.as_ref() {
            self.persist(bundle);
        }

        close_browser(browser.as_ref()).await;

        match outcome.status {
            ScenarioStatus::Passed => info!("Test completed: {}", outcome.name),
            ScenarioStatus::Failed => {
                error!("Test FAILED: {}", outcome.name);
                if let Some(video) = bundle.as_ref().and_then(|b| b.video.as_ref()) {
                    info!("Failure video: {}", video.display());
                }
            }
            ScenarioStatus::Skipped => info!("Test skipped: {}", outcome.name),
        }
        bundle
    }

    fn end_aborted(&self, outcome: &ScenarioOutcome) -> Option<FailureBundle> {
        let bundle = failure_bundle(outcome, Utc::now())?;
        if let Some(error) = &outcome.error {
            error!(scenario = %outcome.name, "ERROR: {error}");
        }
        self.persist(&bundle);
        error!("Test FAILED before a browser was available: {}", outcome.name);
        Some(bundle)
    }

    fn persist(&self, bundle: &FailureBundle) {
        info!("\n{}", bundle.summary());
        match bundle.save(&self.layout) {
            Ok(path) => debug!(path = %path.display(), "failure bundle saved"),
            Err(e) => error!(error = %e, "Error saving failure bundle"),
        }
    }
}

fn failure_bundle(outcome: &ScenarioOutcome, now: DateTime<Utc>) -> Option<FailureBundle> {
    outcome.failed().then(|| {
        FailureBundle::new(
            &outcome.name,
            &outcome.feature,
            outcome.line,
            outcome.tags.clone(),
            outcome.duration,
            now,
            outcome.error.clone(),
        )
    })
}

impl Drop for ScenarioLifecycle {
    fn drop(&mut self) {
        if self.is_active() {
            warn!("scenario lifecycle dropped while active; browser was not closed cleanly");
        }
    }
}

async fn close_context(context: &dyn ContextSession) {
    if let Err(e) = context.close().await {
        warn!(error = %e, "Error closing browser context");
    }
}

async fn close_browser(browser: &dyn BrowserSession) {
    if let Err(e) = browser.close().await {
        warn!(error = %e, "Error closing browser");
    }
}
