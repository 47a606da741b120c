//! Scenario discovery and the `run` / `validate` commands

use crate::commands::{RunArgs, ValidateArgs};
use crate::config::{harness_config, CliConfig};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use vigia::{HarnessConfig, Reporter, Scenario, SuiteOutcome, SuiteReport, Verdict};

/// How a command ended, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every scenario passed (exit 0)
    Passed,
    /// At least one scenario failed or errored (exit 1)
    Failed,
}

impl Outcome {
    /// Process exit code
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::Failed => 1,
        }
    }
}

/// Expand files and directories into a sorted list of scenario files
///
/// Directories contribute their `.yaml` and `.yml` files, not recursively.
pub fn discover(inputs: &[PathBuf]) -> CliResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && is_scenario_file(path))
                .collect();
            found.sort();
            if found.is_empty() {
                warn!(dir = %input.display(), "no scenario files in directory");
            }
            files.extend(found);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            return Err(CliError::invalid_argument(format!(
                "{} does not exist",
                input.display()
            )));
        }
    }
    if files.is_empty() {
        return Err(CliError::invalid_argument("no scenario files found"));
    }
    Ok(files)
}

fn is_scenario_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Load every scenario; the first invalid file aborts
pub fn load_all(files: &[PathBuf]) -> CliResult<Vec<Scenario>> {
    files
        .iter()
        .map(|path| Scenario::load(path).map_err(CliError::from))
        .collect()
}

/// `vigia validate`
pub fn validate(config: &CliConfig, args: &ValidateArgs) -> CliResult<Outcome> {
    let output = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let files = discover(&args.scenarios)?;
    let mut invalid = 0usize;
    for path in &files {
        match Scenario::load(path) {
            Ok(scenario) => {
                if !config.verbosity.is_quiet() {
                    println!(
                        "ok    {} ({} steps) {}",
                        scenario.name,
                        scenario.steps.len(),
                        path.display()
                    );
                }
            }
            Err(e) => {
                invalid += 1;
                output.failure(&e.to_string());
            }
        }
    }
    if invalid > 0 {
        return Err(CliError::config(format!(
            "{invalid} of {} scenario file(s) invalid",
            files.len()
        )));
    }
    output.info(&format!("{} scenario file(s) valid", files.len()));
    Ok(Outcome::Passed)
}

/// `vigia run`
pub async fn run(config: &CliConfig, args: &RunArgs) -> CliResult<Outcome> {
    let cwd = std::env::current_dir()?;
    let harness = harness_config(args, &cwd)?;
    let scenarios = load_all(&discover(&args.scenarios)?)?;
    info!(scenarios = scenarios.len(), jobs = harness.jobs, "starting run");

    let mut output = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    output.start_spinner(&format!("running {} scenario(s)", scenarios.len()));
    let started = Instant::now();
    let outcome = execute(&harness, &scenarios).await;
    output.finish();
    let outcome = outcome?;
    report_outcome(&output, &harness, outcome, started.elapsed())
}

/// Finalize whatever verdicts exist, then surface an abort as an error
fn report_outcome(
    output: &ProgressReporter,
    harness: &HarnessConfig,
    outcome: SuiteOutcome,
    elapsed: Duration,
) -> CliResult<Outcome> {
    let report = finalize(outcome.verdicts);
    if let Some(path) = &harness.report {
        match report.write_json(path) {
            Ok(()) => output.info(&format!("report written to {}", path.display())),
            Err(e) => output.warning(&format!("could not write report {}: {e}", path.display())),
        }
    }
    output.summary(&report, elapsed);
    if let Some(e) = outcome.aborted {
        return Err(e.into());
    }
    Ok(if report.all_passed() {
        Outcome::Passed
    } else {
        Outcome::Failed
    })
}

/// Write artifacts and print one line per verdict
pub fn finalize(verdicts: Vec<Verdict>) -> SuiteReport {
    let mut reporter = Reporter::stdout();
    let reports = verdicts
        .into_iter()
        .map(|verdict| reporter.finalize(verdict))
        .collect();
    SuiteReport::new(reports)
}

#[cfg(feature = "browser")]
async fn execute(harness: &HarnessConfig, scenarios: &[Scenario]) -> CliResult<SuiteOutcome> {
    let suite = vigia::SuiteRunner::new(
        vigia::ChromiumLauncher::new(),
        vigia::ScenarioRunner::new(harness.runner_options()),
        harness.session.clone(),
    )
    .with_jobs(harness.jobs);
    Ok(suite.run(scenarios).await)
}

#[cfg(not(feature = "browser"))]
async fn execute(harness: &HarnessConfig, scenarios: &[Scenario]) -> CliResult<SuiteOutcome> {
    let _ = (harness, scenarios);
    Err(CliError::BrowserUnavailable)
}
