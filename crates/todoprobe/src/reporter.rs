//! HTML report built from the cucumber JSON results and the failure bundles.
//!
//! The report is a single self-contained file: failure screenshots are
//! embedded as base64 data URIs, videos are linked relative to the results
//! directory.

use crate::artifacts::{FailureBundle, ResultsLayout};
use crate::result::{ProbeError, ProbeResult};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Report title
pub const REPORT_TITLE: &str = "TodoMVC Test Report";

/// Scenario or step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    /// Passed
    Passed,
    /// Failed, undefined or ambiguous
    Failed,
    /// Skipped or pending
    Skipped,
}

impl TestStatus {
    fn from_cucumber(status: &str) -> Self {
        match status {
            "passed" => Self::Passed,
            "failed" | "undefined" | "ambiguous" => Self::Failed,
            _ => Self::Skipped,
        }
    }

    const fn css_class(self) -> &'static str {
        match self {
            Self::Passed => "pass",
            Self::Failed => "fail",
            Self::Skipped => "skip",
        }
    }
}

/// One feature of the cucumber JSON output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CucumberFeature {
    /// Feature file path
    #[serde(default)]
    pub uri: Option<String>,
    /// Feature name
    #[serde(default)]
    pub name: String,
    /// Scenarios
    #[serde(default)]
    pub elements: Vec<CucumberElement>,
}

/// One scenario of the cucumber JSON output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CucumberElement {
    /// Scenario name
    #[serde(default)]
    pub name: String,
    /// `Scenario`, `Scenario Outline`, ...
    #[serde(default)]
    pub keyword: String,
    /// Line in the feature file
    #[serde(default)]
    pub line: usize,
    /// Tags
    #[serde(default)]
    pub tags: Vec<CucumberTag>,
    /// Before hooks
    #[serde(default)]
    pub before: Vec<CucumberHook>,
    /// Steps
    #[serde(default)]
    pub steps: Vec<CucumberStep>,
    /// After hooks
    #[serde(default)]
    pub after: Vec<CucumberHook>,
}

/// Tag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CucumberTag {
    /// Name, with its `@`
    pub name: String,
}

/// Hook result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CucumberHook {
    /// Result
    #[serde(default)]
    pub result: StepResult,
}

/// Step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CucumberStep {
    /// `Given `, `When `, ...
    #[serde(default)]
    pub keyword: String,
    /// Step text
    #[serde(default)]
    pub name: String,
    /// Result
    #[serde(default)]
    pub result: StepResult,
}

/// Step or hook result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// cucumber status string
    pub status: String,
    /// Duration in nanoseconds
    #[serde(default)]
    pub duration: Option<u64>,
    /// Failure text
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Default for StepResult {
    fn default() -> Self {
        Self {
            status: "skipped".to_string(),
            duration: None,
            error_message: None,
        }
    }
}

impl CucumberElement {
    /// Aggregate status: any failure fails, all passed passes, else skipped
    #[must_use]
    pub fn status(&self) -> TestStatus {
        let results = self
            .before
            .iter()
            .map(|h| &h.result)
            .chain(self.steps.iter().map(|s| &s.result))
            .chain(self.after.iter().map(|h| &h.result))
            .map(|r| TestStatus::from_cucumber(&r.status));
        let mut all_passed = true;
        for status in results {
            match status {
                TestStatus::Failed => return TestStatus::Failed,
                TestStatus::Skipped => all_passed = false,
                TestStatus::Passed => {}
            }
        }
        if all_passed && !self.steps.is_empty() {
            TestStatus::Passed
        } else {
            TestStatus::Skipped
        }
    }

    /// First error message in the scenario
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.before
            .iter()
            .map(|h| &h.result)
            .chain(self.steps.iter().map(|s| &s.result))
            .chain(self.after.iter().map(|h| &h.result))
            .find_map(|r| r.error_message.as_deref())
    }

    /// Total duration in seconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        let nanos: u64 = self.steps.iter().filter_map(|s| s.result.duration).sum();
        nanos as f64 / 1e9
    }
}

/// Scenario counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Scenarios in the report
    pub scenarios: usize,
    /// Passed
    pub passed: usize,
    /// Failed
    pub failed: usize,
    /// Skipped
    pub skipped: usize,
}

impl ReportSummary {
    /// Share of passed scenarios, 1.0 when empty
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pass_rate(&self) -> f64 {
        if self.scenarios == 0 {
            return 1.0;
        }
        self.passed as f64 / self.scenarios as f64
    }
}

/// Results of one run, ready to render
#[derive(Debug, Clone)]
pub struct Report {
    features: Vec<CucumberFeature>,
    bundles: Vec<FailureBundle>,
    root: PathBuf,
    generated_at: DateTime<Utc>,
}

impl Report {
    /// Assemble a report whose links are relative to `root`
    #[must_use]
    pub fn new(features: Vec<CucumberFeature>, bundles: Vec<FailureBundle>, root: impl Into<PathBuf>) -> Self {
        Self {
            features,
            bundles,
            root: root.into(),
            generated_at: Utc::now(),
        }
    }

    /// Parse cucumber JSON output
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Report`] when the JSON is not a feature list.
    pub fn parse_features(json: &str) -> ProbeResult<Vec<CucumberFeature>> {
        serde_json::from_str(json).map_err(|e| ProbeError::Report {
            message: format!("cucumber results are not valid JSON: {e}"),
        })
    }

    /// Load results and bundles from the results directory
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Report`] when the cucumber results are missing or
    /// malformed.
    pub fn load(layout: &ResultsLayout) -> ProbeResult<Self> {
        let path = layout.json_report();
        let json = std::fs::read_to_string(&path).map_err(|e| ProbeError::Report {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let features = Self::parse_features(&json)?;
        let bundles = FailureBundle::load_all(layout)?;
        Ok(Self::new(features, bundles, layout.root()))
    }

    /// Features in the report
    #[must_use]
    pub fn features(&self) -> &[CucumberFeature] {
        &self.features
    }

    /// Scenario counts
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for element in self.features.iter().flat_map(|f| &f.elements) {
            summary.scenarios += 1;
            match element.status() {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// Render and write the HTML file
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn write_html(&self, output_path: &Path) -> ProbeResult<()> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output_path, self.render_html())?;
        Ok(())
    }

    fn bundle_for(&self, feature: &CucumberFeature, element: &CucumberElement) -> Option<&FailureBundle> {
        self.bundles
            .iter()
            .rev()
            .filter(|b| b.scenario == element.name)
            .find(|b| feature.uri.as_deref().map_or(true, |uri| b.feature.ends_with(uri) || uri.ends_with(&b.feature)))
    }

    fn link(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Render the HTML document
    #[must_use]
    pub fn render_html(&self) -> String {
        let summary = self.summary();
        let mut html = String::new();

        html.push_str(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
"#,
        );
        let _ = writeln!(html, "    <title>{REPORT_TITLE}</title>");
        html.push_str(
            r"    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 20px; }
        .summary { background: #f5f5f5; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        .progress-bar { background: #ddd; height: 20px; border-radius: 10px; overflow: hidden; }
        .passed { background: #4caf50; height: 100%; }
        .scenario { padding: 10px; margin: 5px 0; border-radius: 4px; }
        .scenario.pass { background: #e8f5e9; border-left: 4px solid #4caf50; }
        .scenario.fail { background: #ffebee; border-left: 4px solid #f44336; }
        .scenario.skip { background: #fff3e0; border-left: 4px solid #ff9800; }
        .steps { list-style: none; padding-left: 10px; font-family: monospace; }
        .steps .fail { color: #d32f2f; }
        .steps .skip { color: #999; }
        .tags { color: #666; font-size: 0.9em; }
        .error { color: #d32f2f; font-family: monospace; white-space: pre-wrap; }
        .artifacts img { max-width: 640px; border: 1px solid #ddd; }
        .artifacts video { max-width: 640px; }
    </style>
</head>
<body>
",
        );

        let _ = write!(
            html,
            r#"<div class="summary">
    <h1>{REPORT_TITLE}</h1>
    <h2>Results: {}/{} passed ({:.1}%)</h2>
    <div class="progress-bar">
        <div class="passed" style="width: {:.1}%"></div>
    </div>
    <p>{} failed, {} skipped. Generated {}</p>
</div>
"#,
            summary.passed,
            summary.scenarios,
            summary.pass_rate() * 100.0,
            summary.pass_rate() * 100.0,
            summary.failed,
            summary.skipped,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        for feature in &self.features {
            let _ = writeln!(html, "<h2>{}</h2>", escape_html(&feature.name));
            if let Some(uri) = &feature.uri {
                let _ = writeln!(html, r#"<p class="tags">{}</p>"#, escape_html(uri));
            }
            for element in &feature.elements {
                self.render_scenario(&mut html, feature, element);
            }
        }

        html.push_str(
            r"
<footer>
    <p>Generated by todoprobe</p>
</footer>
</body>
</html>
",
        );
        html
    }

    fn render_scenario(&self, html: &mut String, feature: &CucumberFeature, element: &CucumberElement) {
        let status = element.status();
        let _ = writeln!(
            html,
            r#"<div class="scenario {}">
    <strong>{}</strong> - {:?} ({:.2}s)"#,
            status.css_class(),
            escape_html(&element.name),
            status,
            element.duration_secs()
        );
        if !element.tags.is_empty() {
            let tags: Vec<&str> = element.tags.iter().map(|t| t.name.as_str()).collect();
            let _ = writeln!(html, r#"    <div class="tags">{}</div>"#, escape_html(&tags.join(" ")));
        }

        html.push_str("    <ul class=\"steps\">\n");
        for step in &element.steps {
            let class = TestStatus::from_cucumber(&step.result.status).css_class();
            let _ = writeln!(
                html,
                r#"        <li class="{class}">{}{}</li>"#,
                escape_html(&step.keyword),
                escape_html(&step.name)
            );
        }
        html.push_str("    </ul>\n");

        if let Some(error) = element.error() {
            let _ = writeln!(html, r#"    <div class="error">{}</div>"#, escape_html(error));
        }

        if status == TestStatus::Failed {
            if let Some(bundle) = self.bundle_for(feature, element) {
                self.render_artifacts(html, bundle);
            }
        }
        html.push_str("</div>\n");
    }

    fn render_artifacts(&self, html: &mut String, bundle: &FailureBundle) {
        html.push_str("    <div class=\"artifacts\">\n");
        if let Some(path) = &bundle.screenshot {
            match std::fs::read(path) {
                Ok(png) => {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(png);
                    let _ = writeln!(
                        html,
                        r#"        <img alt="Failure screenshot" src="data:image/png;base64,{encoded}">"#
                    );
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "screenshot missing from report");
                    let _ = writeln!(
                        html,
                        r#"        <p><a href="{0}">{0}</a></p>"#,
                        escape_html(&self.link(path))
                    );
                }
            }
        }
        if let Some(path) = &bundle.video {
            let href = escape_html(&self.link(path));
            let _ = writeln!(
                html,
                r#"        <video controls src="{href}"></video>
        <p><a href="{href}">{href}</a></p>"#
            );
        }
        html.push_str("    </div>\n");
    }
}

/// Read the results directory and write the HTML report next to it
///
/// # Errors
///
/// Returns error if the results cannot be read or the report cannot be written.
pub fn generate(layout: &ResultsLayout) -> ProbeResult<ReportSummary> {
    let report = Report::load(layout)?;
    let output = layout.html_report();
    report.write_html(&output)?;
    tracing::info!(path = %output.display(), "HTML report written");
    Ok(report.summary())
}

/// Escape HTML special characters
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
