//! Verdicts: what happened when a scenario ran.
//!
//! A [`VerdictRecorder`] is created when a scenario starts and only ever
//! appends (step records, artifacts, the first failure). [`VerdictRecorder::finish`]
//! consumes it and produces the immutable [`Verdict`].

use crate::driver::ConsoleMessage;
use crate::result::{ErrorKind, HarnessError};
use crate::step::Step;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

/// Scenario outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    /// Every step passed
    Passed,
    /// A step's expectation was not met
    Failed,
    /// The harness could not carry out a step (driver, script or panic)
    Errored,
}

impl VerdictStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Status for a step error
    #[must_use]
    pub const fn for_error(error: &HarnessError) -> Self {
        if error.is_verification_failure() {
            Self::Failed
        } else {
            Self::Errored
        }
    }

    /// Summary-line label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed => "FAIL",
            Self::Errored => "ERROR",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Zero-based position in the scenario
    pub index: usize,
    /// Action name
    pub action: String,
    /// Human-readable description
    pub description: String,
    /// Outcome
    pub status: VerdictStatus,
    /// Time spent in the step
    pub elapsed_ms: u64,
}

impl StepRecord {
    /// Record for `step` at `index`
    #[must_use]
    pub fn new(index: usize, step: &Step, status: VerdictStatus, elapsed: Duration) -> Self {
        Self {
            index,
            action: step.name().to_string(),
            description: step.to_string(),
            status,
            elapsed_ms: millis(elapsed),
        }
    }
}

/// Why a scenario did not pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Zero-based failing step; `None` when setup failed
    pub step: Option<usize>,
    /// Failing step description
    pub description: Option<String>,
    /// Error classification
    pub kind: ErrorKind,
    /// Error message
    pub message: String,
    /// Locator involved, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    /// Time spent waiting before giving up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waited_ms: Option<u64>,
    /// Matches seen by the final probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_count: Option<usize>,
}

impl Failure {
    /// Describe `error`, raised by `step` at `index` (or during setup)
    #[must_use]
    pub fn from_error(index: Option<usize>, step: Option<&Step>, error: &HarnessError) -> Self {
        let mut failure = Self {
            step: index,
            description: step.map(ToString::to_string),
            kind: error.kind(),
            message: error.to_string(),
            locator: step.and_then(Step::locator).map(ToString::to_string),
            waited_ms: None,
            last_seen_count: None,
        };
        match error {
            HarnessError::NotFound {
                locator,
                elapsed,
                last_seen_count,
            } => {
                failure.locator = Some(locator.clone());
                failure.waited_ms = Some(millis(*elapsed));
                failure.last_seen_count = Some(*last_seen_count);
            }
            HarnessError::Action { locator, .. } => failure.locator = Some(locator.clone()),
            _ => {}
        }
        failure
    }

    /// Describe a panic raised by `step` at `index`
    #[must_use]
    pub fn panic(index: usize, step: &Step, message: impl Into<String>) -> Self {
        Self {
            step: Some(index),
            description: Some(step.to_string()),
            kind: ErrorKind::Panic,
            message: format!("step panicked: {}", message.into()),
            locator: step.locator().map(ToString::to_string),
            waited_ms: None,
            last_seen_count: None,
        }
    }
}

/// Kind of artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Screenshot requested by a step
    Screenshot,
    /// Screenshot taken after a failure
    Diagnostic,
    /// Captured browser console
    ConsoleLog,
}

/// A file the reporter writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Destination
    pub path: PathBuf,
    /// Kind
    pub kind: ArtifactKind,
    /// Size in bytes
    pub size: usize,
    #[serde(skip)]
    bytes: Vec<u8>,
}

impl Artifact {
    /// Create an artifact
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: ArtifactKind, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            kind,
            size: bytes.len(),
            bytes,
        }
    }

    /// Contents to write
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// =============================================================================
// RECORDER
// =============================================================================

/// Append-only builder for a [`Verdict`]
#[derive(Debug)]
pub struct VerdictRecorder {
    scenario: String,
    total_steps: usize,
    started_at: DateTime<Utc>,
    clock: Instant,
    steps: Vec<StepRecord>,
    artifacts: Vec<Artifact>,
    failure: Option<(VerdictStatus, Failure)>,
}

impl VerdictRecorder {
    /// Start recording a scenario of `total_steps` steps
    #[must_use]
    pub fn new(scenario: impl Into<String>, total_steps: usize) -> Self {
        Self {
            scenario: scenario.into(),
            total_steps,
            started_at: Utc::now(),
            clock: Instant::now(),
            steps: Vec::new(),
            artifacts: Vec::new(),
            failure: None,
        }
    }

    /// Append a step record
    pub fn record_step(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    /// Append an artifact
    pub fn add_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// Record the failure; only the first one is kept
    pub fn fail(&mut self, status: VerdictStatus, failure: Failure) {
        if self.failure.is_none() && status != VerdictStatus::Passed {
            self.failure = Some((status, failure));
        }
    }

    /// Whether a failure has been recorded
    #[must_use]
    pub const fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Zero-based index of the failing step, if one failed
    #[must_use]
    pub fn failed_step(&self) -> Option<usize> {
        self.failure.as_ref().and_then(|(_, f)| f.step)
    }

    /// Artifacts so far
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Finalize
    #[must_use]
    pub fn finish(self, console: Vec<ConsoleMessage>) -> Verdict {
        let (status, failure) = match self.failure {
            Some((status, failure)) => (status, Some(failure)),
            None => (VerdictStatus::Passed, None),
        };
        Verdict {
            scenario: self.scenario,
            status,
            total_steps: self.total_steps,
            steps: self.steps,
            failure,
            artifacts: self.artifacts,
            console,
            started_at: self.started_at,
            elapsed_ms: millis(self.clock.elapsed()),
        }
    }
}

/// Final, immutable scenario result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    scenario: String,
    status: VerdictStatus,
    total_steps: usize,
    steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<Failure>,
    artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    console: Vec<ConsoleMessage>,
    started_at: DateTime<Utc>,
    elapsed_ms: u64,
}

impl Verdict {
    /// Scenario name
    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Outcome
    #[must_use]
    pub const fn status(&self) -> VerdictStatus {
        self.status
    }

    /// Whether every step passed
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.status.is_passed()
    }

    /// Number of steps in the scenario
    #[must_use]
    pub const fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Executed steps
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Failure detail
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Zero-based index of the failing step
    #[must_use]
    pub fn failed_step(&self) -> Option<usize> {
        self.failure.as_ref().and_then(|f| f.step)
    }

    /// Recorded artifacts
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Paths of artifacts of one kind
    #[must_use]
    pub fn artifact_paths(&self, kind: ArtifactKind) -> Vec<&Path> {
        self.artifacts
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.path.as_path())
            .collect()
    }

    /// Captured console messages
    #[must_use]
    pub fn console(&self) -> &[ConsoleMessage] {
        &self.console
    }

    /// Wall-clock start
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Elapsed time
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
