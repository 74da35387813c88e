//! Run command handler

use super::resolve_settings;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::RunArgs;
use std::sync::Arc;
use todoprobe::driver::Launcher;
use todoprobe::runner::{self, RunContext, RunSummary};
use todoprobe::{ResultsLayout, StepVocabulary};

/// Run the selected feature files and return the process exit code
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<u8> {
    let launcher = launcher()?;
    execute_with(config, args, launcher)
}

/// [`execute_run`] with an explicit browser backend
pub fn execute_with(
    config: &CliConfig,
    args: &RunArgs,
    launcher: Arc<dyn Launcher>,
) -> CliResult<u8> {
    if args.workers == 0 {
        return Err(CliError::invalid_argument("--workers must be at least 1"));
    }
    if !args.features.exists() {
        return Err(CliError::invalid_argument(format!(
            "feature path {} does not exist",
            args.features.display()
        )));
    }

    let out = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let settings = Arc::new(resolve_settings(&args.selection)?);
    out.banner(&settings)?;

    let vocabulary = Arc::new(StepVocabulary::todo_mvc()?);
    tracing::debug!(phrases = vocabulary.len(), "step vocabulary ready");

    let mut ctx = RunContext::new(settings, launcher, vocabulary, &args.features)
        .with_layout(ResultsLayout::new(&args.results))
        .with_workers(args.workers);
    if let Some(tag) = &args.tag {
        ctx = ctx.with_tag(tag);
    }
    if args.no_html {
        ctx = ctx.without_html_report();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(runner::run(ctx))?;
    report(&out, &summary, &args.results);
    Ok(summary.exit_code())
}

fn report(out: &Reporter, summary: &RunSummary, results: &std::path::Path) {
    if let Some(report) = summary.report {
        out.summary(report.passed, report.failed, report.skipped, summary.duration);
        out.info(&format!(
            "HTML report: {}",
            ResultsLayout::new(results).html_report().display()
        ));
    }
    if summary.parsing_errors > 0 {
        out.failure(&format!(
            "{} feature file(s) failed to parse",
            summary.parsing_errors
        ));
    }
    if summary.hook_errors > 0 {
        out.failure(&format!("{} hook(s) failed", summary.hook_errors));
    }
    if summary.failed {
        out.failure("Run failed");
    } else {
        out.success("Run passed");
    }
}

#[cfg(feature = "browser")]
fn launcher() -> CliResult<Arc<dyn Launcher>> {
    Ok(todoprobe::default_launcher())
}

#[cfg(not(feature = "browser"))]
fn launcher() -> CliResult<Arc<dyn Launcher>> {
    Err(CliError::NoBackend)
}
