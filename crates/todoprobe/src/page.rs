//! Generic page interactions.
//!
//! [`Interactions`] wraps a [`PageDriver`] with the context's defaults: every
//! operation is bounded by the default timeout, actions auto-wait for their
//! target to become visible, and `slowMo` delays each action.

use crate::browser::{join_url, ContextOptions};
use crate::driver::PageDriver;
use crate::locator::{ElementState, Locator};
use crate::result::{ProbeError, ProbeResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Polling interval for auto-waiting
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Element state to wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// At least one match exists
    Attached,
    /// At least one match is visible
    Visible,
    /// No match is visible
    Hidden,
}

impl WaitState {
    fn satisfied_by(self, elements: &[ElementState]) -> bool {
        match self {
            Self::Attached => !elements.is_empty(),
            Self::Visible => elements.iter().any(|e| e.visible),
            Self::Hidden => elements.iter().all(|e| !e.visible),
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

/// A page or component with its own locators and behavior
pub trait PageObject {
    /// URL path (relative to the base URL) the page lives at
    fn url_pattern(&self) -> &str;

    /// The interaction helper the page object drives
    fn interactions(&self) -> &Interactions;

    /// Page name for logging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Page helper shared by every page object
#[derive(Clone)]
pub struct Interactions {
    page: Arc<dyn PageDriver>,
    base_url: String,
    timeout: Duration,
    slow_mo: Option<Duration>,
}

impl std::fmt::Debug for Interactions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interactions")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("slow_mo", &self.slow_mo)
            .finish_non_exhaustive()
    }
}

impl Interactions {
    /// Wrap `page` with the defaults from `options`
    #[must_use]
    pub fn new(page: Arc<dyn PageDriver>, options: &ContextOptions) -> Self {
        Self {
            page,
            base_url: options.base_url.clone(),
            timeout: options.default_timeout,
            slow_mo: options.slow_mo,
        }
    }

    /// Override the default timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.page
    }

    /// Default timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve `url` against the base URL
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        join_url(&self.base_url, url)
    }

    async fn bounded<T>(
        &self,
        operation: impl FnOnce() -> String,
        fut: impl Future<Output = ProbeResult<T>>,
    ) -> ProbeResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout {
                operation: operation(),
                ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    async fn pace(&self) {
        if let Some(delay) = self.slow_mo {
            tokio::time::sleep(delay).await;
        }
    }

    /// Navigate to `url` (relative URLs resolve against the base URL)
    pub async fn navigate(&self, url: &str) -> ProbeResult<()> {
        let target = self.resolve_url(url);
        tracing::debug!(url = %target, "navigate");
        self.pace().await;
        self.bounded(
            || format!("navigation to {target}"),
            self.page.goto(&target),
        )
        .await
    }

    /// Reload the current page
    pub async fn reload(&self) -> ProbeResult<()> {
        self.pace().await;
        self.bounded(|| "reload".to_string(), self.page.reload()).await
    }

    /// Wait until `locator` reaches `state`
    pub async fn wait_for(&self, locator: &Locator, state: WaitState) -> ProbeResult<Vec<ElementState>> {
        self.bounded(
            || format!("waiting for {locator} to be {}", state.describe()),
            async {
                loop {
                    let elements = self.page.query_all(locator).await?;
                    if state.satisfied_by(&elements) {
                        return Ok::<_, ProbeError>(elements);
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            },
        )
        .await
    }

    /// Wait until `locator` is visible
    pub async fn wait_for_selector(&self, locator: &Locator) -> ProbeResult<()> {
        self.wait_for(locator, WaitState::Visible).await.map(|_| ())
    }

    /// Click the first match once it is visible
    pub async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        self.wait_for_selector(locator).await?;
        self.pace().await;
        self.bounded(|| format!("click {locator}"), self.page.click(locator))
            .await
    }

    /// Fill the first match once it is visible
    pub async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        self.wait_for_selector(locator).await?;
        self.pace().await;
        self.bounded(|| format!("fill {locator}"), self.page.fill(locator, value))
            .await
    }

    /// Press `key` on the first match once it is visible
    pub async fn press(&self, locator: &Locator, key: &str) -> ProbeResult<()> {
        self.wait_for_selector(locator).await?;
        self.pace().await;
        self.bounded(
            || format!("press {key} on {locator}"),
            self.page.press(locator, key),
        )
        .await
    }

    /// Hover the first match once it is visible
    pub async fn hover(&self, locator: &Locator) -> ProbeResult<()> {
        self.wait_for_selector(locator).await?;
        self.pace().await;
        self.bounded(|| format!("hover {locator}"), self.page.hover(locator))
            .await
    }

    /// Bring a checkbox to `checked`, clicking only when needed
    pub async fn set_checked(&self, locator: &Locator, checked: bool) -> ProbeResult<()> {
        let elements = self.wait_for(locator, WaitState::Visible).await?;
        if elements.first().is_some_and(|e| e.checked == checked) {
            return Ok(());
        }
        self.pace().await;
        self.bounded(|| format!("click {locator}"), self.page.click(locator))
            .await?;
        // A filtered list may drop the element once its state flips
        let settled = |els: &Vec<ElementState>| els.first().map_or(true, |e| e.checked == checked);
        let after = self
            .poll_until(|| self.query_all(locator), &settled)
            .await?;
        if settled(&after) {
            Ok(())
        } else {
            Err(ProbeError::assertion(format!(
                "clicking {locator} did not change its state to {}",
                if checked { "checked" } else { "unchecked" }
            )))
        }
    }

    /// `textContent` of the first match, once attached
    pub async fn text(&self, locator: &Locator) -> ProbeResult<String> {
        let elements = self.wait_for(locator, WaitState::Attached).await?;
        elements
            .into_iter()
            .next()
            .map(|e| e.text)
            .ok_or_else(|| ProbeError::ElementNotFound {
                locator: locator.to_string(),
            })
    }

    /// Whether any match is visible right now (no waiting)
    pub async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
        Ok(self.query_all(locator).await?.iter().any(|e| e.visible))
    }

    /// Current state of every match (no waiting)
    pub async fn query_all(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        self.bounded(|| format!("query {locator}"), self.page.query_all(locator))
            .await
    }

    /// Number of visible matches (no waiting)
    pub async fn count_visible(&self, locator: &Locator) -> ProbeResult<usize> {
        Ok(self
            .query_all(locator)
            .await?
            .iter()
            .filter(|e| e.visible)
            .count())
    }

    /// Current URL
    pub async fn url(&self) -> ProbeResult<String> {
        self.bounded(|| "reading url".to_string(), self.page.url()).await
    }

    /// Document title
    pub async fn title(&self) -> ProbeResult<String> {
        self.bounded(|| "reading title".to_string(), self.page.title())
            .await
    }

    /// Sleep for `duration`
    pub async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// PNG screenshot
    pub async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>> {
        self.bounded(|| "screenshot".to_string(), self.page.screenshot(full_page))
            .await
    }

    /// Re-run `probe` until `accept` holds or the timeout elapses.
    ///
    /// Returns the last observed value either way, so callers can report it.
    pub async fn poll_until<T, F, Fut>(&self, mut probe: F, accept: impl Fn(&T) -> bool) -> ProbeResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeResult<T>>,
    {
        let deadline = Instant::now() + self.timeout;
        loop {
            let value = probe().await?;
            if accept(&value) || Instant::now() >= deadline {
                return Ok(value);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserKind, LaunchOptions};
    use crate::config::Viewport;
    use crate::driver::{Launcher, MockLauncher};

    fn options(timeout_ms: u64) -> ContextOptions {
        ContextOptions {
            viewport: Viewport::default(),
            locale: "en-US".into(),
            accept_language: "en-US,en".into(),
            base_url: "http://localhost:8080/todomvc/".into(),
            record_video_dir: None,
            default_timeout: Duration::from_millis(timeout_ms),
            slow_mo: None,
        }
    }

    async fn interactions(launcher: &MockLauncher, timeout_ms: u64) -> Interactions {
        let opts = options(timeout_ms);
        let browser = launcher
            .launch(BrowserKind::Chromium, &LaunchOptions::default())
            .await
            .unwrap();
        let context = browser.new_context(&opts).await.unwrap();
        Interactions::new(context.new_page().await.unwrap(), &opts)
    }

    fn visible(text: &str) -> ElementState {
        ElementState {
            text: text.into(),
            visible: true,
            ..ElementState::default()
        }
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test]
        async fn test_relative_navigation_uses_base_url() {
            let launcher = MockLauncher::new();
            let page = interactions(&launcher, 200).await;
            page.navigate("#/active").await.unwrap();
            assert!(launcher
                .log()
                .was_called("page.goto:http://localhost:8080/todomvc/#/active"));
            assert_eq!(page.url().await.unwrap(), "http://localhost:8080/todomvc/#/active");
        }

        #[tokio::test]
        async fn test_absolute_navigation_passes_through() {
            let launcher = MockLauncher::new();
            let page = interactions(&launcher, 200).await;
            page.navigate("https://example.com/").await.unwrap();
            assert!(launcher.log().was_called("page.goto:https://example.com/"));
        }
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_waits_for_visible_target() {
            let launcher = MockLauncher::new();
            let button = Locator::new("button.go");
            launcher.set_elements(&button, vec![visible("Go")]);
            let page = interactions(&launcher, 200).await;
            page.click(&button).await.unwrap();
            assert!(launcher.log().was_called("page.click:button.go"));
        }

        #[tokio::test]
        async fn test_click_times_out_on_missing_target() {
            let launcher = MockLauncher::new();
            let page = interactions(&launcher, 150).await;
            let err = page.click(&Locator::new(".missing")).await.unwrap_err();
            match err {
                ProbeError::Timeout { operation, ms } => {
                    assert_eq!(ms, 150);
                    assert!(operation.contains(".missing"));
                }
                other => panic!("expected timeout, got {other}"),
            }
            assert!(!launcher.log().was_called("page.click"));
        }

        #[tokio::test]
        async fn test_hidden_target_is_not_clicked() {
            let launcher = MockLauncher::new();
            let hidden = Locator::new(".hidden");
            launcher.set_elements(&hidden, vec![ElementState::default()]);
            let page = interactions(&launcher, 100).await;
            assert!(page.click(&hidden).await.is_err());
        }

        #[tokio::test]
        async fn test_set_checked_is_noop_when_already_in_state() {
            let launcher = MockLauncher::new();
            let toggle = Locator::new("input.toggle");
            launcher.set_elements(
                &toggle,
                vec![ElementState {
                    checked: true,
                    ..visible("")
                }],
            );
            let page = interactions(&launcher, 200).await;
            page.set_checked(&toggle, true).await.unwrap();
            assert!(!launcher.log().was_called("page.click"));
        }

        #[tokio::test]
        async fn test_set_checked_reports_unchanged_state() {
            let launcher = MockLauncher::new();
            let toggle = Locator::new("input.toggle");
            launcher.set_elements(&toggle, vec![visible("")]);
            let page = interactions(&launcher, 200).await;
            let err = page.set_checked(&toggle, true).await.unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
            assert!(launcher.log().was_called("page.click:input.toggle"));
        }
    }

    mod query_tests {
        use super::*;

        #[tokio::test]
        async fn test_text_returns_first_match() {
            let launcher = MockLauncher::new();
            let count = Locator::new(".todo-count");
            launcher.set_elements(&count, vec![visible(" 2 items left ")]);
            let page = interactions(&launcher, 200).await;
            assert_eq!(page.text(&count).await.unwrap(), " 2 items left ");
        }

        #[tokio::test]
        async fn test_count_and_visibility() {
            let launcher = MockLauncher::new();
            let items = Locator::new(".todo-list li");
            launcher.set_elements(
                &items,
                vec![visible("a"), ElementState::default(), visible("b")],
            );
            let page = interactions(&launcher, 200).await;
            assert_eq!(page.count_visible(&items).await.unwrap(), 2);
            assert!(page.is_visible(&items).await.unwrap());
            assert!(!page.is_visible(&Locator::new(".none")).await.unwrap());
        }

        #[tokio::test]
        async fn test_wait_for_hidden_with_no_matches() {
            let launcher = MockLauncher::new();
            let page = interactions(&launcher, 200).await;
            let found = page
                .wait_for(&Locator::new(".gone"), WaitState::Hidden)
                .await
                .unwrap();
            assert!(found.is_empty());
        }

        #[tokio::test]
        async fn test_poll_until_returns_last_value_on_timeout() {
            let launcher = MockLauncher::new();
            let page = interactions(&launcher, 120).await;
            let mut calls = 0;
            let value = page
                .poll_until(
                    || {
                        calls += 1;
                        let current = calls;
                        async move { Ok::<_, ProbeError>(current) }
                    },
                    |v| *v > 1_000,
                )
                .await
                .unwrap();
            assert!(value >= 2);
        }

        #[tokio::test]
        async fn test_poll_until_stops_when_accepted() {
            let launcher = MockLauncher::new();
            let page = interactions(&launcher, 5_000).await;
            let value = page
                .poll_until(|| async { Ok::<_, ProbeError>(7) }, |v| *v == 7)
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
    }

    mod stalled_tests {
        use super::*;
        use async_trait::async_trait;
        use std::sync::atomic::{AtomicUsize, Ordering};

        /// Answers the first `answers` queries, then never again
        struct StalledPage {
            answers: AtomicUsize,
        }

        impl StalledPage {
            fn after(answers: usize) -> Arc<dyn PageDriver> {
                Arc::new(Self {
                    answers: AtomicUsize::new(answers),
                })
            }
        }

        #[async_trait]
        impl PageDriver for StalledPage {
            async fn goto(&self, _url: &str) -> ProbeResult<()> {
                Ok(())
            }
            async fn reload(&self) -> ProbeResult<()> {
                Ok(())
            }
            async fn url(&self) -> ProbeResult<String> {
                Ok("about:blank".into())
            }
            async fn title(&self) -> ProbeResult<String> {
                Ok(String::new())
            }
            async fn query_all(&self, _locator: &Locator) -> ProbeResult<Vec<ElementState>> {
                let left = self.answers.load(Ordering::SeqCst);
                if left == 0 {
                    return std::future::pending().await;
                }
                self.answers.store(left - 1, Ordering::SeqCst);
                Ok(vec![visible("")])
            }
            async fn click(&self, _locator: &Locator) -> ProbeResult<()> {
                Ok(())
            }
            async fn fill(&self, _locator: &Locator, _value: &str) -> ProbeResult<()> {
                Ok(())
            }
            async fn press(&self, _locator: &Locator, _key: &str) -> ProbeResult<()> {
                Ok(())
            }
            async fn hover(&self, _locator: &Locator) -> ProbeResult<()> {
                Ok(())
            }
            async fn screenshot(&self, _full_page: bool) -> ProbeResult<Vec<u8>> {
                Ok(Vec::new())
            }
            async fn close(&self) -> ProbeResult<()> {
                Ok(())
            }
        }

        #[tokio::test]
        async fn test_is_visible_honors_timeout() {
            let page = Interactions::new(StalledPage::after(0), &options(100));
            let err = page.is_visible(&Locator::new(".todo-count")).await.unwrap_err();
            assert!(matches!(err, ProbeError::Timeout { ms: 100, .. }));
        }

        #[tokio::test]
        async fn test_set_checked_poll_honors_timeout() {
            let page = Interactions::new(StalledPage::after(1), &options(100));
            let err = page
                .set_checked(&Locator::new("input.toggle"), true)
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::Timeout { .. }));
        }
    }
}
