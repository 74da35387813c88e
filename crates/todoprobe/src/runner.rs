//! Suite runner: drives the feature files through cucumber with one
//! [`ScenarioLifecycle`] per scenario.

use crate::artifacts::ResultsLayout;
use crate::config::RunSettings;
use crate::driver::Launcher;
use crate::lifecycle::{ScenarioLifecycle, ScenarioOutcome, ScenarioStatus};
use crate::reporter::{self, ReportSummary};
use crate::result::ProbeResult;
use crate::steps::StepVocabulary;
use crate::world::{self, TodoWorld};
use cucumber::event::ScenarioFinished;
use cucumber::gherkin;
use cucumber::writer::{self, Stats as _};
use cucumber::{World as _, WriterExt as _};
use futures::future::FutureExt;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Tag that excludes a scenario from every run
pub const SKIP_TAG: &str = "skip";

/// Everything a run needs, shared by all scenarios
#[derive(Clone)]
pub struct RunContext {
    /// Resolved profiles and switches
    pub settings: Arc<RunSettings>,
    /// Browser backend
    pub launcher: Arc<dyn Launcher>,
    /// Step table
    pub vocabulary: Arc<StepVocabulary>,
    /// Results directory
    pub layout: ResultsLayout,
    /// Feature file or directory
    pub features: PathBuf,
    /// Scenarios run at once
    pub workers: usize,
    /// Only run scenarios carrying this tag (without `@`)
    pub tag: Option<String>,
    /// Write the HTML report after the run
    pub html_report: bool,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("launcher", &self.launcher.name())
            .field("environment", &self.settings.environment_name)
            .field("browser", &self.settings.browser_name)
            .field("features", &self.features)
            .field("workers", &self.workers)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Context with one worker, no tag filter and an HTML report
    #[must_use]
    pub fn new(
        settings: Arc<RunSettings>,
        launcher: Arc<dyn Launcher>,
        vocabulary: Arc<StepVocabulary>,
        features: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            launcher,
            vocabulary,
            layout: ResultsLayout::default(),
            features: features.into(),
            workers: 1,
            tag: None,
            html_report: true,
        }
    }

    /// Use another results directory
    #[must_use]
    pub fn with_layout(mut self, layout: ResultsLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Run up to `workers` scenarios at once
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Only run scenarios tagged `tag`
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into().trim_start_matches('@').to_string());
        self
    }

    /// Skip the HTML report
    #[must_use]
    pub const fn without_html_report(mut self) -> Self {
        self.html_report = false;
        self
    }
}

/// Aggregate result of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Whether any scenario, step or hook failed
    pub failed: bool,
    /// Failed steps
    pub failed_steps: usize,
    /// Skipped steps
    pub skipped_steps: usize,
    /// Hook failures
    pub hook_errors: usize,
    /// Feature files that did not parse
    pub parsing_errors: usize,
    /// HTML report counts, when one was written
    pub report: Option<ReportSummary>,
    /// Wall-clock run time
    pub duration: Duration,
}

impl RunSummary {
    /// Process exit code: 0 on success, 1 otherwise
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.failed {
            1
        } else {
            0
        }
    }
}

/// Whether a scenario takes part in the run
#[must_use]
pub fn scenario_selected(tags: &[String], only: Option<&str>) -> bool {
    if tags.iter().any(|t| t == SKIP_TAG) {
        return false;
    }
    only.map_or(true, |tag| tags.iter().any(|t| t == tag))
}

fn outcome(
    feature: &gherkin::Feature,
    scenario: &gherkin::Scenario,
    finished: &ScenarioFinished,
    world: Option<&TodoWorld>,
) -> ScenarioOutcome {
    let status = match finished {
        ScenarioFinished::StepPassed => ScenarioStatus::Passed,
        ScenarioFinished::StepSkipped => ScenarioStatus::Skipped,
        _ => ScenarioStatus::Failed,
    };
    let error = world.and_then(|w| w.last_error.clone()).or_else(|| {
        (status == ScenarioStatus::Failed).then(|| match finished {
            ScenarioFinished::BeforeHookFailed(_) => "before hook failed".to_string(),
            _ => "step failed".to_string(),
        })
    });
    ScenarioOutcome {
        name: scenario.name.clone(),
        feature: feature
            .path
            .as_deref()
            .map_or_else(|| feature.name.clone(), |p| p.display().to_string()),
        line: scenario.position.line,
        tags: scenario.tags.iter().map(|t| format!("@{t}")).collect(),
        status,
        error,
        duration: world
            .and_then(|w| w.started)
            .map(|s| s.elapsed())
            .unwrap_or_default(),
    }
}

/// Run every selected scenario and write the reports.
///
/// # Errors
///
/// Only for results-directory errors; scenario failures are reported through
/// [`RunSummary::failed`].
pub async fn run(ctx: RunContext) -> ProbeResult<RunSummary> {
    let started = Instant::now();
    ctx.layout.ensure()?;
    let json = std::fs::File::create(ctx.layout.json_report())?;

    info!(
        environment = %ctx.settings.environment_name,
        browser = %ctx.settings.browser_name,
        kind = %ctx.settings.browser_kind,
        headless = ctx.settings.headless,
        record_video = ctx.settings.record_video,
        features = %ctx.features.display(),
        "starting run"
    );

    let mut cucumber = TodoWorld::cucumber();
    for pattern in ctx.vocabulary.patterns() {
        cucumber = cucumber
            .given(pattern.clone(), world::dispatch)
            .when(pattern.clone(), world::dispatch)
            .then(pattern.clone(), world::dispatch);
    }

    let before_ctx = ctx.clone();
    let only = ctx.tag.clone();
    let writer = cucumber
        .max_concurrent_scenarios(ctx.workers)
        .fail_on_skipped()
        .before(move |_feature, _rule, scenario, world| {
            let ctx = before_ctx.clone();
            async move {
                info!("Running: {}", scenario.name);
                world.started = Some(Instant::now());
                world.vocabulary = Some(Arc::clone(&ctx.vocabulary));
                let lifecycle = world.lifecycle.insert(ScenarioLifecycle::new(
                    Arc::clone(&ctx.launcher),
                    Arc::clone(&ctx.settings),
                    ctx.layout.clone(),
                ));
                if let Err(e) = lifecycle.begin(ctx.settings.browser_kind).await {
                    error!(scenario = %scenario.name, error = %e, "scenario setup failed");
                    world.record_error(&e);
                    panic!("{e}");
                }
            }
            .boxed_local()
        })
        .after(|feature, _rule, scenario, finished, world| {
            async move {
                let Some(world) = world else {
                    return;
                };
                let outcome = outcome(feature, scenario, finished, Some(&*world));
                if let Some(lifecycle) = world.lifecycle.as_mut() {
                    lifecycle.end(&outcome).await;
                }
            }
            .boxed_local()
        })
        .with_writer(
            writer::Basic::stdout()
                .summarized()
                .tee::<TodoWorld, _>(writer::Json::for_tee(json))
                .normalized(),
        )
        .with_default_cli()
        .filter_run(ctx.features.clone(), move |_, _, scenario| {
            scenario_selected(&scenario.tags, only.as_deref())
        })
        .await;

    let mut summary = RunSummary {
        failed: writer.execution_has_failed(),
        failed_steps: writer.failed_steps(),
        skipped_steps: writer.skipped_steps(),
        hook_errors: writer.hook_errors(),
        parsing_errors: writer.parsing_errors(),
        report: None,
        duration: Duration::ZERO,
    };

    if ctx.html_report {
        match reporter::generate(&ctx.layout) {
            Ok(report) => summary.report = Some(report),
            Err(e) => error!(error = %e, "HTML report was not written"),
        }
    }
    summary.duration = started.elapsed();
    info!(
        failed = summary.failed,
        failed_steps = summary.failed_steps,
        hook_errors = summary.hook_errors,
        secs = summary.duration.as_secs_f64(),
        "run finished"
    );
    Ok(summary)
}

/// Resolve `path` against `base` unless it is absolute
#[must_use]
pub fn features_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
