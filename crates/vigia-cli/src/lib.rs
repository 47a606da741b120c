//! Vigia CLI library
//!
//! Command-line front end for the Vigia harness: `vigia run` executes
//! scenario files against Chromium, `vigia validate` checks them offline.
//!
//! Exit codes: 0 when every scenario passed, 1 when any failed or errored,
//! 2 when the run itself could not happen (bad arguments, invalid scenario
//! files, no browser).

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, RunArgs, ValidateArgs};
pub use config::{harness_config, CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
pub use runner::{discover, finalize, load_all, run, validate, Outcome};

/// Exit code for errors that stop the run before any verdict
pub const EXIT_USAGE: u8 = 2;
