//! CLI configuration

use crate::commands::{ColorArg, RunArgs};
use crate::error::{CliError, CliResult};
use std::path::Path;
use std::time::Duration;
use vigia::HarnessConfig;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Quiet - failures and the final tally only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Derive from `-q` and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info,vigia=debug",
            Self::Debug => "debug,vigia=trace",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
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

/// CLI configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }
}

/// Harness config for a run: the config file (explicit or discovered in
/// `cwd`), then command-line flags on top
pub fn harness_config(args: &RunArgs, cwd: &Path) -> CliResult<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::discover(cwd)?,
    };
    if let Some(base) = &args.base_url {
        config.base_url = Some(base.clone());
    }
    if let Some(dir) = &args.artifacts {
        config.artifact_dir = dir.clone();
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(timeout) = args.timeout {
        config.default_timeout_ms = timeout;
    }
    if let Some(report) = &args.report {
        config.report = Some(report.clone());
    }
    if args.headed {
        config.session.headless = false;
    }
    if args.no_sandbox {
        config.session.sandbox = false;
    }
    if let Some(chromium) = &args.chromium {
        config.session.chromium_path = Some(chromium.clone());
    }
    if args.console {
        config.session.console_logging = true;
    }
    config
        .validate()
        .map_err(|e| CliError::config(e.to_string()))?;
    if config.default_timeout_ms == 0 {
        return Err(CliError::invalid_argument("--timeout must be positive"));
    }
    tracing::debug!(
        jobs = config.jobs,
        timeout = ?Duration::from_millis(config.default_timeout_ms),
        artifacts = %config.artifact_dir.display(),
        "harness configured"
    );
    Ok(config)
}
