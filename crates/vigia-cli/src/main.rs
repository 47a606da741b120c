//! Vigia CLI: run UI verification scenarios
//!
//! ## Usage
//!
//! ```bash
//! vigia validate scenarios/             # Check scenario files
//! vigia run scenarios/ -j 2             # Run against headless Chromium
//! vigia run widget.yaml --headed -vv    # Watch it, with debug logs
//! ```

use clap::Parser;
use std::process::ExitCode;
use vigia_cli::{logging, Cli, CliConfig, CliResult, Commands, Outcome, Verbosity, EXIT_USAGE};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    let json_logs = std::env::var("VIGIA_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    logging::init(config.verbosity, json_logs);

    match run(&cli, &config) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
}

fn run(cli: &Cli, config: &CliConfig) -> CliResult<Outcome> {
    match &cli.command {
        Commands::Validate(args) => vigia_cli::validate(config, args),
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(vigia_cli::run(config, args))
        }
    }
}
