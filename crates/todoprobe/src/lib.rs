//! todoprobe: browser acceptance tests for the TodoMVC application.
//!
//! Gherkin scenarios run through `cucumber`; every step is bound to a
//! [`TodoPage`] action or check; the page drives a browser through the
//! [`driver`] seam, which the CDP backend implements over chromiumoxide.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ .feature     │──►│ Step         │──►│ TodoPage /   │──►│ PageDriver   │
//! │ scenarios    │   │ vocabulary   │   │ Interactions │   │ (CDP / mock) │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//!         │                                                        ▲
//!         └──── ScenarioLifecycle: browser ▸ context ▸ page ───────┘
//! ```

#![warn(missing_docs)]

mod artifacts;
mod browser;
#[cfg(feature = "browser")]
pub mod cdp;
mod config;
pub mod driver;
mod lifecycle;
mod locator;
pub mod logging;
mod page;
pub mod reporter;
mod result;
pub mod runner;
pub mod steps;
mod todo_page;
mod world;

pub use artifacts::{
    artifact_file_name, file_timestamp, rename_video, sanitize_name, save_screenshot, stack_lines,
    FailureBundle, ResultsLayout, DEFAULT_RESULTS_DIR, MAX_NAME_LEN,
};
pub use browser::{
    join_url, resolve_channel, BrowserKind, ContextOptions, LaunchOptions, CHROMIUM_ARGS,
    DEFAULT_ACCEPT_LANGUAGE, DEFAULT_LOCALE,
};
pub use config::{
    BrowserProfile, DefaultSelection, EnvironmentProfile, Overrides, RunSettings,
    TestConfiguration, Viewport, DEFAULT_CONFIG_FILE, ENV_BROWSER, ENV_BROWSER_KIND,
    ENV_HEADLESS, ENV_RECORD_VIDEO, ENV_TEST_ENV,
};
pub use lifecycle::{ScenarioLifecycle, ScenarioOutcome, ScenarioStatus};
pub use locator::{ElementState, Locator, Selector};
pub use page::{Interactions, PageObject, WaitState, POLL_INTERVAL};
pub use result::{ProbeError, ProbeResult};
pub use runner::{RunContext, RunSummary};
pub use steps::StepVocabulary;
pub use todo_page::{selectors, Filter, TodoPage};
pub use world::TodoWorld;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The launcher for real browsers, when the `browser` feature is on
#[cfg(feature = "browser")]
#[must_use]
pub fn default_launcher() -> std::sync::Arc<dyn driver::Launcher> {
    std::sync::Arc::new(cdp::CdpLauncher::new())
}
