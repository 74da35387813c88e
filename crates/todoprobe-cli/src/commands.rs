//! CLI command definitions using clap

use crate::config::ColorChoice;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use todoprobe::{
    Overrides, DEFAULT_CONFIG_FILE, DEFAULT_RESULTS_DIR, ENV_BROWSER, ENV_BROWSER_KIND,
    ENV_HEADLESS, ENV_RECORD_VIDEO, ENV_TEST_ENV,
};

/// todoprobe: browser acceptance tests for TodoMVC
#[derive(Parser, Debug)]
#[command(name = "todoprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run feature files against the TodoMVC application
    Run(RunArgs),

    /// Rebuild the HTML report from a results directory
    Report(ReportArgs),

    /// Show the resolved configuration
    Config(ConfigArgs),
}

/// Profile selection shared by `run` and `config`.
///
/// Every flag falls back to the matching environment variable.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Environment profile name
    #[arg(short, long = "env", env = ENV_TEST_ENV)]
    pub environment: Option<String>,

    /// Browser profile name
    #[arg(short, long, env = ENV_BROWSER)]
    pub browser: Option<String>,

    /// "false" forces a visible browser window
    #[arg(long, env = ENV_HEADLESS, value_name = "BOOL")]
    pub headless: Option<String>,

    /// "true" records a video of every scenario
    #[arg(long, env = ENV_RECORD_VIDEO, value_name = "BOOL")]
    pub record_video: Option<String>,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(long, env = ENV_BROWSER_KIND)]
    pub browser_kind: Option<String>,
}

impl SelectionArgs {
    /// Overrides as the library understands them; blank values count as unset
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        let set = |v: &Option<String>| v.clone().filter(|v| !v.trim().is_empty());
        Overrides {
            environment: set(&self.environment),
            browser: set(&self.browser),
            headless: set(&self.headless),
            record_video: set(&self.record_video),
            browser_kind: set(&self.browser_kind),
        }
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Profile selection
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Feature file or directory
    #[arg(short, long, default_value = "features")]
    pub features: PathBuf,

    /// Scenarios run at once
    #[arg(short = 'j', long, default_value = "1")]
    pub workers: usize,

    /// Only run scenarios carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Results directory
    #[arg(short, long, default_value = DEFAULT_RESULTS_DIR)]
    pub results: PathBuf,

    /// Skip the HTML report
    #[arg(long)]
    pub no_html: bool,
}

/// Arguments for the report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Results directory
    #[arg(short, long, default_value = DEFAULT_RESULTS_DIR)]
    pub results: PathBuf,

    /// Open in browser after generation
    #[arg(long)]
    pub open: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Profile selection
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// List every environment and browser profile
    #[arg(long)]
    pub list: bool,

    /// Print the resolved selection as JSON
    #[arg(long)]
    pub json: bool,
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
