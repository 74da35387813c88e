//! Browser driver seam.
//!
//! ```text
//! Launcher ──launch──▶ BrowserSession ──new_context──▶ ContextSession ──new_page──▶ PageDriver
//! ```
//!
//! The lifecycle manager and the page abstraction only see these traits. The
//! CDP backend implements them over chromiumoxide; [`MockLauncher`] implements
//! them in memory and records every call for verification.

use crate::browser::{BrowserKind, ContextOptions, LaunchOptions};
use crate::locator::{ElementState, Locator};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Starts browser processes
#[async_trait]
pub trait Launcher: Send + Sync + fmt::Debug {
    /// Backend name used in logs and errors
    fn name(&self) -> &'static str;

    /// Launch a browser of `kind`
    async fn launch(
        &self,
        kind: BrowserKind,
        options: &LaunchOptions,
    ) -> ProbeResult<Box<dyn BrowserSession>>;
}

/// A running browser process
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open an isolated context (no shared cookies or storage)
    async fn new_context(&self, options: &ContextOptions) -> ProbeResult<Box<dyn ContextSession>>;

    /// Terminate the browser
    async fn close(&self) -> ProbeResult<()>;
}

/// An isolated browsing context
#[async_trait]
pub trait ContextSession: Send + Sync {
    /// Open a page in this context
    async fn new_page(&self) -> ProbeResult<Arc<dyn PageDriver>>;

    /// Where this context's video will be once the context is closed
    fn video_path(&self) -> Option<PathBuf>;

    /// Close the context, flushing any video recording
    async fn close(&self) -> ProbeResult<()>;
}

/// One page (tab)
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the load event
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Reload and wait for the load event
    async fn reload(&self) -> ProbeResult<()>;

    /// Current URL
    async fn url(&self) -> ProbeResult<String>;

    /// Document title
    async fn title(&self) -> ProbeResult<String>;

    /// State of every element matching `locator`, in document order
    async fn query_all(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>>;

    /// Click the first match
    async fn click(&self, locator: &Locator) -> ProbeResult<()>;

    /// Replace the value of the first match
    async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()>;

    /// Press a key (e.g. `"Enter"`) with the first match focused
    async fn press(&self, locator: &Locator, key: &str) -> ProbeResult<()>;

    /// Move the pointer over the first match
    async fn hover(&self, locator: &Locator) -> ProbeResult<()>;

    /// PNG screenshot
    async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>>;

    /// Close the page
    async fn close(&self) -> ProbeResult<()>;
}

// ============================================================================
// Mock implementation
// ============================================================================

/// Shared call history of a mock browser tree
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, call: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.into());
    }

    /// Snapshot of all recorded calls, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of calls starting with `prefix`
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Position of the first call starting with `prefix`
    #[must_use]
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }

    /// Check if a call starting with `prefix` was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.count(prefix) > 0
    }
}

/// Failure switches for a mock browser tree
#[derive(Debug, Clone, Default)]
pub struct MockFailures {
    /// `launch` fails
    pub launch: bool,
    /// `new_context` fails
    pub new_context: bool,
    /// `new_page` fails
    pub new_page: bool,
    /// `screenshot` fails
    pub screenshot: bool,
    /// `ContextSession::close` fails
    pub context_close: bool,
    /// `BrowserSession::close` fails
    pub browser_close: bool,
}

/// In-memory launcher for unit testing
#[derive(Debug, Clone, Default)]
pub struct MockLauncher {
    log: CallLog,
    failures: MockFailures,
    video: Option<PathBuf>,
    elements: Arc<Mutex<HashMap<String, Vec<ElementState>>>>,
}

impl MockLauncher {
    /// Create a new mock launcher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject failures
    #[must_use]
    pub fn with_failures(mut self, failures: MockFailures) -> Self {
        self.failures = failures;
        self
    }

    /// Report `path` as the video of every recording context
    #[must_use]
    pub fn with_video(mut self, path: impl Into<PathBuf>) -> Self {
        self.video = Some(path.into());
        self
    }

    /// Elements returned for `locator` by every page
    pub fn set_elements(&self, locator: &Locator, elements: Vec<ElementState>) {
        self.elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(locator.to_string(), elements);
    }

    /// Call history
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

fn injected(what: &str) -> ProbeError {
    ProbeError::page(format!("injected {what} failure"))
}

#[async_trait]
impl Launcher for MockLauncher {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn launch(
        &self,
        kind: BrowserKind,
        options: &LaunchOptions,
    ) -> ProbeResult<Box<dyn BrowserSession>> {
        self.log
            .push(format!("launch:{kind}:headless={}", options.headless));
        if self.failures.launch {
            return Err(ProbeError::BrowserLaunch {
                message: "injected launch failure".to_string(),
            });
        }
        Ok(Box::new(MockBrowser {
            launcher: self.clone(),
        }))
    }
}

struct MockBrowser {
    launcher: MockLauncher,
}

#[async_trait]
impl BrowserSession for MockBrowser {
    async fn new_context(&self, options: &ContextOptions) -> ProbeResult<Box<dyn ContextSession>> {
        self.launcher.log.push(format!(
            "browser.new_context:{}x{}:{}",
            options.viewport.width, options.viewport.height, options.locale
        ));
        if self.launcher.failures.new_context {
            return Err(ProbeError::Context {
                message: "injected context failure".to_string(),
            });
        }
        let video = options
            .record_video_dir
            .as_ref()
            .and(self.launcher.video.clone());
        Ok(Box::new(MockContext {
            launcher: self.launcher.clone(),
            video,
        }))
    }

    async fn close(&self) -> ProbeResult<()> {
        self.launcher.log.push("browser.close");
        if self.launcher.failures.browser_close {
            return Err(injected("browser close"));
        }
        Ok(())
    }
}

struct MockContext {
    launcher: MockLauncher,
    video: Option<PathBuf>,
}

#[async_trait]
impl ContextSession for MockContext {
    async fn new_page(&self) -> ProbeResult<Arc<dyn PageDriver>> {
        self.launcher.log.push("context.new_page");
        if self.launcher.failures.new_page {
            return Err(injected("new page"));
        }
        Ok(Arc::new(MockPage {
            launcher: self.launcher.clone(),
            url: Mutex::new("about:blank".to_string()),
        }))
    }

    fn video_path(&self) -> Option<PathBuf> {
        self.video.clone()
    }

    async fn close(&self) -> ProbeResult<()> {
        self.launcher.log.push("context.close");
        if self.launcher.failures.context_close {
            return Err(injected("context close"));
        }
        Ok(())
    }
}

/// Page whose elements are scripted through [`MockLauncher::set_elements`]
struct MockPage {
    launcher: MockLauncher,
    url: Mutex<String>,
}

impl MockPage {
    fn record(&self, call: String) {
        self.launcher.log.push(call);
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        self.record(format!("page.goto:{url}"));
        *self.url.lock().unwrap_or_else(PoisonError::into_inner) = url.to_string();
        Ok(())
    }

    async fn reload(&self) -> ProbeResult<()> {
        self.record("page.reload".to_string());
        Ok(())
    }

    async fn url(&self) -> ProbeResult<String> {
        Ok(self.url.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn title(&self) -> ProbeResult<String> {
        Ok("Mock".to_string())
    }

    async fn query_all(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        Ok(self
            .launcher
            .elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&locator.to_string())
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        self.record(format!("page.click:{locator}"));
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        self.record(format!("page.fill:{locator}:{value}"));
        Ok(())
    }

    async fn press(&self, locator: &Locator, key: &str) -> ProbeResult<()> {
        self.record(format!("page.press:{locator}:{key}"));
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> ProbeResult<()> {
        self.record(format!("page.hover:{locator}"));
        Ok(())
    }

    async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>> {
        self.record(format!("page.screenshot:full_page={full_page}"));
        if self.launcher.failures.screenshot {
            return Err(ProbeError::Screenshot {
                message: "injected screenshot failure".to_string(),
            });
        }
        // PNG signature is enough for callers that only persist bytes
        Ok(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
    }

    async fn close(&self) -> ProbeResult<()> {
        self.record("page.close".to_string());
        Ok(())
    }
}
