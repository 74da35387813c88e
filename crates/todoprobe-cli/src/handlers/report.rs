//! Report command handler

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Reporter;
use crate::ReportArgs;
use std::path::Path;
use todoprobe::{reporter, ResultsLayout};

/// Rebuild `cucumber-report.html` from the JSON results and failure bundles
pub fn execute_report(config: &CliConfig, args: &ReportArgs) -> CliResult<()> {
    let out = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let layout = ResultsLayout::new(&args.results);
    let summary = reporter::generate(&layout)?;

    out.info(&format!(
        "Report generated at: {}",
        layout.html_report().display()
    ));
    let counts = format!(
        "{} scenarios: {} passed, {} failed, {} skipped ({:.0}% pass rate)",
        summary.scenarios,
        summary.passed,
        summary.failed,
        summary.skipped,
        summary.pass_rate() * 100.0
    );
    if summary.failed > 0 {
        out.failure(&counts);
    } else {
        out.success(&counts);
    }

    if args.open {
        open_in_browser(&layout.html_report());
    }
    Ok(())
}

/// Open a file in the system's default browser
pub fn open_in_browser(path: &Path) {
    #[cfg(target_os = "macos")]
    let _ = std::process::Command::new("open").arg(path).spawn();
    #[cfg(target_os = "linux")]
    let _ = std::process::Command::new("xdg-open").arg(path).spawn();
    #[cfg(target_os = "windows")]
    let _ = std::process::Command::new("cmd")
        .args(["/C", "start", ""])
        .arg(path)
        .spawn();
}
