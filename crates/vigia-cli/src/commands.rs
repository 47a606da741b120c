//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Vigia: run UI verification scenarios against a headless browser
#[derive(Parser, Debug)]
#[command(name = "vigia")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only failures and the final tally)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios and report a verdict for each
    Run(RunArgs),

    /// Parse and validate scenario files without launching a browser
    Validate(ValidateArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Scenario files or directories of `.yaml`/`.yml` files
    #[arg(required = true)]
    pub scenarios: Vec<PathBuf>,

    /// Harness config file (default: vigia.yaml in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL for relative navigation targets
    #[arg(long, env = "VIGIA_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory for failure diagnostics
    #[arg(short = 'o', long)]
    pub artifacts: Option<PathBuf>,

    /// Scenarios to run in parallel
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Default locator timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Write a JSON report of the run
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the Chromium sandbox (containers)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Chromium binary
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium: Option<String>,

    /// Capture and log browser console output
    #[arg(long)]
    pub console: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Scenario files or directories of `.yaml`/`.yml` files
    #[arg(required = true)]
    pub scenarios: Vec<PathBuf>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Colors when stderr is a terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "vigia", "-vv", "run", "a.yaml", "dir", "-j", "2", "--headed", "--timeout", "800",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            unreachable!()
        };
        assert_eq!(args.scenarios.len(), 2);
        assert_eq!(args.jobs, Some(2));
        assert_eq!(args.timeout, Some(800));
        assert!(args.headed && !args.no_sandbox);
    }

    #[test]
    fn test_run_requires_scenarios() {
        assert!(Cli::try_parse_from(["vigia", "run"]).is_err());
    }

    #[test]
    fn test_validate_args() {
        let cli = Cli::try_parse_from(["vigia", "--color", "never", "validate", "x.yml"]).unwrap();
        assert!(matches!(cli.color, ColorArg::Never));
        assert!(matches!(cli.command, Commands::Validate(_)));
    }
}
