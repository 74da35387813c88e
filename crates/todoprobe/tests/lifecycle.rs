//! Scenario lifecycle against the recording mock launcher.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use todoprobe::driver::{MockFailures, MockLauncher};
use todoprobe::{
    BrowserKind, Overrides, ProbeError, ResultsLayout, RunSettings, ScenarioLifecycle,
    ScenarioOutcome, ScenarioStatus, TestConfiguration,
};

const CONFIG: &str = r#"{
    "environments": {
        "local": { "name": "Local", "baseUrl": "http://localhost:8080", "timeout": 200 },
        "staging": { "name": "Staging", "baseUrl": "https://staging.example.com", "timeout": 200 }
    },
    "browsers": {
        "chromium": { "headless": true, "viewport": { "width": 1280, "height": 720 } },
        "mobile": { "headless": true, "viewport": { "width": 375, "height": 667 } }
    },
    "default": { "environment": "local", "browser": "chromium" }
}"#;

fn settings(overrides: &Overrides) -> Arc<RunSettings> {
    let config = Arc::new(TestConfiguration::from_json(CONFIG).unwrap());
    Arc::new(RunSettings::resolve(config, overrides).unwrap())
}

fn recording() -> Overrides {
    Overrides {
        record_video: Some("true".to_string()),
        ..Overrides::default()
    }
}

fn outcome(status: ScenarioStatus) -> ScenarioOutcome {
    ScenarioOutcome {
        name: "Complete a task".to_string(),
        feature: "features/todo_list.feature".to_string(),
        line: 12,
        tags: vec!["@smoke".to_string()],
        status,
        error: (status == ScenarioStatus::Failed)
            .then(|| "Assertion failed: Task \"Buy milk\" should be completed".to_string()),
        duration: Duration::from_millis(1500),
    }
}

fn lifecycle(launcher: &MockLauncher, settings: Arc<RunSettings>, dir: &TempDir) -> ScenarioLifecycle {
    ScenarioLifecycle::new(
        Arc::new(launcher.clone()),
        settings,
        ResultsLayout::new(dir.path()),
    )
}

mod begin_tests {
    use super::*;

    #[tokio::test]
    async fn test_begin_acquires_browser_context_and_page() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new();
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);

        assert_eq!(lc.state_name(), "uninitialized");
        lc.begin(BrowserKind::Chromium).await.unwrap();
        assert!(lc.is_active());
        assert!(lc.page().is_ok());

        let log = launcher.log();
        assert!(log.was_called("launch:chromium:headless=true"));
        assert!(log.was_called("browser.new_context:1280x720:en-US"));
        assert_eq!(log.count("context.new_page"), 1);

        lc.end(&outcome(ScenarioStatus::Passed)).await;
    }

    #[tokio::test]
    async fn test_profiles_shape_the_context() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new();
        let overrides = Overrides {
            environment: Some("staging".to_string()),
            browser: Some("mobile".to_string()),
            headless: Some("false".to_string()),
            ..Overrides::default()
        };
        let mut lc = lifecycle(&launcher, settings(&overrides), &dir);

        lc.begin(BrowserKind::Chromium).await.unwrap();
        lc.page().unwrap().navigate().await.ok();

        let log = launcher.log();
        assert!(log.was_called("launch:chromium:headless=false"));
        assert!(log.was_called("browser.new_context:375x667"));
        assert!(log.was_called("page.goto:https://staging.example.com"));

        lc.end(&outcome(ScenarioStatus::Passed)).await;
    }

    #[tokio::test]
    async fn test_begin_twice_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new();
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);

        lc.begin(BrowserKind::Chromium).await.unwrap();
        let err = lc.begin(BrowserKind::Chromium).await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidState { .. }));
        assert_eq!(launcher.log().count("launch:"), 1);

        lc.end(&outcome(ScenarioStatus::Passed)).await;
    }

    #[tokio::test]
    async fn test_launch_failure_leaves_nothing_to_release() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new().with_failures(MockFailures {
            launch: true,
            ..MockFailures::default()
        });
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);

        let err = lc.begin(BrowserKind::Chromium).await.unwrap_err();
        assert!(matches!(err, ProbeError::BrowserLaunch { .. }));
        assert_eq!(lc.state_name(), "aborted");
        assert!(lc.page().is_err());

        lc.end(&outcome(ScenarioStatus::Failed)).await;
        assert_eq!(lc.state_name(), "torn-down");
        assert!(!launcher.log().was_called("browser.close"));
        assert!(!launcher.log().was_called("page.screenshot"));
    }

    #[tokio::test]
    async fn test_failed_setup_still_saves_summary_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new().with_failures(MockFailures {
            launch: true,
            ..MockFailures::default()
        });
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap_err();

        let bundle = lc.end(&outcome(ScenarioStatus::Failed)).await.unwrap();
        assert_eq!(bundle.scenario, "Complete a task");
        assert!(bundle.error.as_deref().unwrap().contains("should be completed"));
        assert!(bundle.screenshot.is_none());
        assert!(bundle.video.is_none());

        let saved = todoprobe::FailureBundle::load_all(&ResultsLayout::new(dir.path())).unwrap();
        assert_eq!(saved.len(), 1);
        assert!(lc.end(&outcome(ScenarioStatus::Failed)).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_setup_with_passing_outcome_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new().with_failures(MockFailures {
            launch: true,
            ..MockFailures::default()
        });
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap_err();

        assert!(lc.end(&outcome(ScenarioStatus::Passed)).await.is_none());
        assert!(!ResultsLayout::new(dir.path()).attachments().exists());
    }

    #[tokio::test]
    async fn test_context_failure_releases_browser() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new().with_failures(MockFailures {
            new_context: true,
            ..MockFailures::default()
        });
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);

        let err = lc.begin(BrowserKind::Chromium).await.unwrap_err();
        assert!(matches!(err, ProbeError::Context { .. }));
        assert_eq!(launcher.log().count("browser.close"), 1);
        assert!(!lc.is_active());
    }

    #[tokio::test]
    async fn test_page_failure_releases_context_then_browser() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new().with_failures(MockFailures {
            new_page: true,
            ..MockFailures::default()
        });
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);

        assert!(lc.begin(BrowserKind::Chromium).await.is_err());
        let log = launcher.log();
        assert_eq!(log.count("context.close"), 1);
        assert_eq!(log.count("browser.close"), 1);
        assert!(log.position("context.close") < log.position("browser.close"));
    }
}

mod end_tests {
    use super::*;

    #[tokio::test]
    async fn test_passed_scenario_releases_once_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new();
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap();

        let bundle = lc.end(&outcome(ScenarioStatus::Passed)).await;
        assert!(bundle.is_none());
        assert_eq!(lc.state_name(), "torn-down");

        let log = launcher.log();
        assert_eq!(log.count("context.close"), 1);
        assert_eq!(log.count("browser.close"), 1);
        assert!(log.position("context.close") < log.position("browser.close"));
        assert!(!log.was_called("page.screenshot"));
        assert!(!ResultsLayout::new(dir.path()).attachments().exists());
    }

    #[tokio::test]
    async fn test_end_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new();
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap();

        assert!(lc.end(&outcome(ScenarioStatus::Failed)).await.is_some());
        assert!(lc.end(&outcome(ScenarioStatus::Failed)).await.is_none());
        assert_eq!(launcher.log().count("browser.close"), 1);
        assert_eq!(launcher.log().count("page.screenshot"), 1);
    }

    #[tokio::test]
    async fn test_end_before_begin_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new();
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);

        assert!(lc.end(&outcome(ScenarioStatus::Failed)).await.is_none());
        assert_eq!(lc.state_name(), "uninitialized");
        assert!(launcher.log().calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_scenario_captures_screenshot_before_release() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new();
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap();

        let bundle = lc.end(&outcome(ScenarioStatus::Failed)).await.unwrap();
        let log = launcher.log();
        assert!(log.was_called("page.screenshot:full_page=true"));
        assert!(log.position("page.screenshot") < log.position("context.close"));

        let screenshot = bundle.screenshot.as_ref().unwrap();
        assert!(screenshot.starts_with(ResultsLayout::new(dir.path()).screenshots()));
        assert_eq!(screenshot.extension().unwrap(), "png");
        assert!(screenshot.exists());
        assert_eq!(bundle.scenario, "Complete a task");
        assert_eq!(bundle.tags, vec!["@smoke".to_string()]);
        assert!(bundle.error.as_deref().unwrap().contains("should be completed"));
        assert!(bundle.video.is_none());

        let saved = todoprobe::FailureBundle::load_all(&ResultsLayout::new(dir.path())).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].screenshot.as_ref(), Some(screenshot));
    }

    #[tokio::test]
    async fn test_artifact_failures_do_not_block_release() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new().with_failures(MockFailures {
            screenshot: true,
            context_close: true,
            ..MockFailures::default()
        });
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap();

        let bundle = lc.end(&outcome(ScenarioStatus::Failed)).await.unwrap();
        assert!(bundle.screenshot.is_none());
        assert_eq!(launcher.log().count("browser.close"), 1);
        assert_eq!(lc.state_name(), "torn-down");
    }

    #[tokio::test]
    async fn test_browser_close_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new().with_failures(MockFailures {
            browser_close: true,
            ..MockFailures::default()
        });
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap();

        assert!(lc.end(&outcome(ScenarioStatus::Passed)).await.is_none());
        assert_eq!(lc.state_name(), "torn-down");
    }
}

mod video_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_scenario_video_is_renamed_and_attached() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ResultsLayout::new(dir.path());
        std::fs::create_dir_all(layout.videos()).unwrap();
        let raw = layout.videos().join("3f2a9c.webm");
        std::fs::write(&raw, b"webm").unwrap();

        let launcher = MockLauncher::new().with_video(&raw);
        let mut lc = lifecycle(&launcher, settings(&recording()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap();

        let bundle = lc.end(&outcome(ScenarioStatus::Failed)).await.unwrap();
        let video = bundle.video.unwrap();
        assert!(!raw.exists());
        assert!(video.exists());
        assert!(video
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Complete_a_task_"));
        assert_eq!(video.extension().unwrap(), "webm");
    }

    #[tokio::test]
    async fn test_passed_scenario_video_is_renamed_but_not_attached() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ResultsLayout::new(dir.path());
        std::fs::create_dir_all(layout.videos()).unwrap();
        let raw = layout.videos().join("passed.webm");
        std::fs::write(&raw, b"webm").unwrap();

        let launcher = MockLauncher::new().with_video(&raw);
        let mut lc = lifecycle(&launcher, settings(&recording()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap();

        assert!(lc.end(&outcome(ScenarioStatus::Passed)).await.is_none());
        assert!(!raw.exists());
        let renamed = std::fs::read_dir(layout.videos()).unwrap().count();
        assert_eq!(renamed, 1);
    }

    #[tokio::test]
    async fn test_missing_video_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ResultsLayout::new(dir.path());
        let launcher = MockLauncher::new().with_video(layout.videos().join("never-written.webm"));
        let mut lc = lifecycle(&launcher, settings(&recording()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap();

        let bundle = lc.end(&outcome(ScenarioStatus::Failed)).await.unwrap();
        assert!(bundle.video.is_none());
        assert!(bundle.screenshot.is_some());
        assert_eq!(launcher.log().count("browser.close"), 1);
    }

    #[tokio::test]
    async fn test_no_recording_means_no_video_dir() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new().with_video(dir.path().join("ignored.webm"));
        let mut lc = lifecycle(&launcher, settings(&Overrides::default()), &dir);
        lc.begin(BrowserKind::Chromium).await.unwrap();

        lc.end(&outcome(ScenarioStatus::Failed)).await;
        assert!(!ResultsLayout::new(dir.path()).videos().exists());
    }
}
