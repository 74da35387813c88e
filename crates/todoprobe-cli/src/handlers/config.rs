//! Config command handler

use super::resolve_settings;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Reporter;
use crate::ConfigArgs;
use serde::Serialize;
use todoprobe::{BrowserProfile, EnvironmentProfile, RunSettings};

/// The resolved selection, as printed by `config --json`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSelection<'a> {
    /// Environment name
    pub environment_name: &'a str,
    /// Environment profile
    pub environment: &'a EnvironmentProfile,
    /// Browser profile name
    pub browser_name: &'a str,
    /// Browser profile
    pub browser: &'a BrowserProfile,
    /// Browser kind
    pub browser_kind: String,
    /// Effective headless flag
    pub headless: bool,
    /// Whether video is recorded
    pub record_video: bool,
}

impl<'a> ResolvedSelection<'a> {
    /// Borrow the selection out of resolved settings
    pub fn new(settings: &'a RunSettings) -> CliResult<Self> {
        Ok(Self {
            environment_name: &settings.environment_name,
            environment: settings.environment()?,
            browser_name: &settings.browser_name,
            browser: settings.browser()?,
            browser_kind: settings.browser_kind.to_string(),
            headless: settings.headless,
            record_video: settings.record_video,
        })
    }
}

/// Execute the config command
pub fn execute_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let settings = resolve_settings(&args.selection)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ResolvedSelection::new(&settings)?)?
        );
        return Ok(());
    }

    let out = Reporter::stdout(config.color.should_color(), false);
    if args.list {
        println!("Environments:");
        for (name, env) in &settings.config().environments {
            println!("  {name:<12} {} ({})", env.name, env.base_url);
        }
        println!("Browsers:");
        for (name, browser) in &settings.config().browsers {
            println!(
                "  {name:<12} {}x{}{}",
                browser.viewport.width,
                browser.viewport.height,
                if browser.headless { " headless" } else { "" }
            );
        }
        return Ok(());
    }
    out.banner(&settings)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SelectionArgs;
    use std::path::Path;

    const CONFIG: &str = r#"{
        "environments": {
            "dev": { "name": "Development", "baseUrl": "https://demo.playwright.dev/todomvc", "timeout": 30000 },
            "ci": { "name": "CI", "baseUrl": "http://localhost:8080", "timeout": 10000 }
        },
        "browsers": {
            "chromium": { "headless": true, "viewport": { "width": 1280, "height": 720 } }
        },
        "default": { "environment": "dev", "browser": "chromium" }
    }"#;

    fn selection(dir: &Path) -> SelectionArgs {
        let path = dir.join("test.config.json");
        std::fs::write(&path, CONFIG).unwrap();
        SelectionArgs {
            config_file: path,
            ..SelectionArgs::default()
        }
    }

    #[test]
    fn test_resolved_selection_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut selection = selection(dir.path());
        selection.environment = Some("ci".into());
        selection.headless = Some("false".into());

        let settings = resolve_settings(&selection).unwrap();
        let json = serde_json::to_value(ResolvedSelection::new(&settings).unwrap()).unwrap();
        assert_eq!(json["environmentName"], "ci");
        assert_eq!(json["environment"]["baseUrl"], "http://localhost:8080");
        assert_eq!(json["browserKind"], "chromium");
        assert_eq!(json["headless"], false);
        assert_eq!(json["recordVideo"], false);
    }

    #[test]
    fn test_unknown_environment_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut selection = selection(dir.path());
        selection.environment = Some("qa".into());

        let err = resolve_settings(&selection).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Available environments: ci, dev"));
    }

    #[test]
    fn test_execute_list() {
        let dir = tempfile::tempdir().unwrap();
        let args = ConfigArgs {
            selection: selection(dir.path()),
            list: true,
            json: false,
        };
        execute_config(&CliConfig::new(), &args).unwrap();
    }
}
