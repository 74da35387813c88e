//! todoprobe: run TodoMVC acceptance scenarios
//!
//! ## Usage
//!
//! ```bash
//! todoprobe run                                # every feature under ./features
//! todoprobe run --env staging --tag @smoke     # one environment, one tag
//! HEADLESS=false RECORD_VIDEO=true todoprobe run
//! todoprobe report --open                      # rebuild and open the HTML report
//! todoprobe config --list                      # show the available profiles
//! ```

use clap::Parser;
use std::process::ExitCode;
use todoprobe::logging::{self, LogFormat};
use todoprobe_cli::{handlers, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity};

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> CliResult<u8> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    console::set_colors_enabled(config.color.should_color());
    console::set_colors_enabled_stderr(config.color.should_color());
    logging::init(config.verbosity.log_level(), config.log_format)?;

    match cli.command {
        Commands::Run(args) => handlers::execute_run(&config, &args),
        Commands::Report(args) => handlers::execute_report(&config, &args).map(|()| 0),
        Commands::Config(args) => handlers::execute_config(&config, &args).map(|()| 0),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.clone().into();
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
        .with_log_format(format)
}
