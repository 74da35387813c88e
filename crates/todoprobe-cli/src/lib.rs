//! todoprobe CLI library
//!
//! Command-line front end for the todoprobe acceptance suite: `run` drives the
//! feature files against the configured TodoMVC deployment, `report` rebuilds
//! the HTML report from a results directory, `config` shows what a run would
//! use.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, ReportArgs, RunArgs, SelectionArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Reporter;
