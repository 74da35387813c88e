//! Command handlers

pub mod config;
pub mod report;
pub mod run;

pub use config::execute_config;
pub use report::execute_report;
pub use run::execute_run;

use crate::error::CliResult;
use crate::SelectionArgs;
use std::sync::Arc;
use todoprobe::{RunSettings, TestConfiguration};

/// Load the configuration file and resolve the selected profiles
pub fn resolve_settings(selection: &SelectionArgs) -> CliResult<RunSettings> {
    let config = TestConfiguration::load(&selection.config_file)?;
    Ok(RunSettings::resolve(Arc::new(config), &selection.overrides())?)
}
