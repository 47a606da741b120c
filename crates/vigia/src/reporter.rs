//! Reporter - Artifacts and Summary Lines
//!
//! [`Reporter::finalize`] writes every artifact a verdict recorded and prints
//! one summary line per scenario. It never fails: a write error is logged,
//! listed in the [`ScenarioReport`] and leaves the verdict status untouched.

use crate::result::HarnessResult;
use crate::verdict::{Verdict, VerdictStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An artifact that could not be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFailure {
    /// Intended destination
    pub path: PathBuf,
    /// I/O error text
    pub error: String,
}

/// Result of finalizing one verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// The verdict, unchanged
    pub verdict: Verdict,
    /// Artifacts written
    pub written: Vec<PathBuf>,
    /// Artifacts that could not be written
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write_failures: Vec<WriteFailure>,
    /// The printed summary line
    pub summary: String,
}

impl ScenarioReport {
    /// Status of the underlying verdict
    #[must_use]
    pub const fn status(&self) -> VerdictStatus {
        self.verdict.status()
    }
}

/// Writes artifacts and summary lines
#[derive(Debug)]
pub struct Reporter<W: Write> {
    out: W,
}

impl Reporter<io::Stdout> {
    /// Reporter printing to stdout
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    /// Reporter printing to `out`
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the sink
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write artifacts and print the summary line
    pub fn finalize(&mut self, verdict: Verdict) -> ScenarioReport {
        let mut written = Vec::new();
        let mut write_failures = Vec::new();
        for artifact in verdict.artifacts() {
            match write_artifact(&artifact.path, artifact.bytes()) {
                Ok(()) => {
                    debug!(path = %artifact.path.display(), bytes = artifact.size, "artifact written");
                    written.push(artifact.path.clone());
                }
                Err(e) => {
                    warn!(path = %artifact.path.display(), error = %e, "artifact not written");
                    write_failures.push(WriteFailure {
                        path: artifact.path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = summary_line(&verdict);
        let mut lines = vec![summary.clone()];
        lines.extend(
            write_failures
                .iter()
                .map(|f| format!("      warning: could not write {}: {}", f.path.display(), f.error)),
        );
        for line in &lines {
            if let Err(e) = writeln!(self.out, "{line}") {
                warn!(error = %e, "summary line not printed");
                break;
            }
        }

        ScenarioReport {
            verdict,
            written,
            write_failures,
            summary,
        }
    }
}

fn write_artifact(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)
}

/// One-line, human-readable scenario summary
#[must_use]
pub fn summary_line(verdict: &Verdict) -> String {
    let secs = verdict.elapsed().as_secs_f64();
    let mut line = format!(
        "{:<5} {} ({secs:.2}s)",
        verdict.status().label(),
        verdict.scenario()
    );
    match verdict.failure() {
        None => line.push_str(&format!(" {} steps", verdict.total_steps())),
        Some(failure) => {
            match (failure.step, &failure.description) {
                (Some(index), Some(description)) => line.push_str(&format!(
                    " step {}/{} `{description}`",
                    index + 1,
                    verdict.total_steps()
                )),
                _ => line.push_str(" during setup"),
            }
            line.push_str(&format!(" [{}] {}", failure.kind, failure.message));
            if let (Some(locator), None) = (&failure.locator, failure.waited_ms) {
                if !failure.message.contains(locator.as_str()) {
                    line.push_str(&format!(" (locator {locator})"));
                }
            }
        }
    }
    line
}

// =============================================================================
// SUITE REPORT
// =============================================================================

/// Machine-readable report of a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// When the report was assembled
    pub generated_at: DateTime<Utc>,
    /// Scenarios that passed
    pub passed: usize,
    /// Scenarios that failed
    pub failed: usize,
    /// Scenarios that errored
    pub errored: usize,
    /// Per-scenario reports, in scenario order
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    /// Aggregate scenario reports
    #[must_use]
    pub fn new(scenarios: Vec<ScenarioReport>) -> Self {
        let count = |status: VerdictStatus| scenarios.iter().filter(|s| s.status() == status).count();
        Self {
            generated_at: Utc::now(),
            passed: count(VerdictStatus::Passed),
            failed: count(VerdictStatus::Failed),
            errored: count(VerdictStatus::Errored),
            scenarios,
        }
    }

    /// Whether every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// Process exit code: 0 when everything passed, 1 otherwise
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.all_passed())
    }

    /// Generate summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} scenario(s): {} passed, {} failed, {} errored",
            self.scenarios.len(),
            self.passed,
            self.failed,
            self.errored
        )
    }

    /// Write as pretty JSON
    pub fn write_json(&self, path: &Path) -> HarnessResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_artifact(path, json.as_bytes())?;
        Ok(())
    }
}
