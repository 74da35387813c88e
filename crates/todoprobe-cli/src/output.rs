//! Console output: the configuration banner and run summaries

use console::{style, Style, Term};
use std::time::Duration;
use todoprobe::{ProbeResult, RunSettings};

/// Status lines written around a run
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Reporter on stderr, leaving stdout to the scenario writer
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Reporter on stdout
    #[must_use]
    pub fn stdout(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.line("");
        self.line(&styled);
    }

    fn field(&self, key: &str, value: &str) {
        if self.use_color {
            self.line(&format!("  {:<14} {}", style(key).dim(), value));
        } else {
            self.line(&format!("  {key:<14} {value}"));
        }
    }

    /// Print the resolved profiles a run will use
    pub fn banner(&self, settings: &RunSettings) -> ProbeResult<()> {
        if self.quiet {
            return Ok(());
        }
        let environment = settings.environment()?;
        let browser = settings.browser()?;

        self.header("Test configuration");
        self.field(
            "Environment:",
            &format!("{} ({})", environment.name, settings.environment_name),
        );
        self.field("Base URL:", &environment.base_url);
        self.field("Timeout:", &format!("{}ms", environment.timeout));
        if let Some(slow_mo) = environment.slow_mo {
            self.field("Slow motion:", &format!("{slow_mo}ms"));
        }
        self.field(
            "Browser:",
            &format!("{} ({})", settings.browser_name, settings.browser_kind),
        );
        if let Some(channel) = &browser.channel {
            self.field("Channel:", channel);
        }
        self.field(
            "Viewport:",
            &format!("{}x{}", browser.viewport.width, browser.viewport.height),
        );
        self.field("Headless:", &settings.headless.to_string());
        self.field("Record video:", &settings.record_video.to_string());
        Ok(())
    }

    /// Print the scenario totals
    pub fn summary(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }
        self.line("");

        let total = passed + failed + skipped;
        let secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            self.line(&format!(
                "{status} {total} scenarios in {secs:.2}s ({} passed, {} failed, {} skipped)",
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped)
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            self.line(&format!(
                "{status} {total} scenarios in {secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)"
            ));
        }
    }
}
