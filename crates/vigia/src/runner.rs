//! Scenario Runner - Sequential Step Execution
//!
//! ```text
//! ┌──────────────┐   setup    ┌───────────────────────────────────────────┐
//! │   Session    │──────────▶ │ init scripts, localStorage seed, viewport │
//! └──────────────┘            └───────────────────────────────────────────┘
//!        │
//!        ▼  for each step (in order, under catch_unwind)
//! ┌──────────────┐  resolve   ┌──────────────┐   act / assert
//! │     Step     │──────────▶ │   Resolver   │──────────────────▶ StepRecord
//! └──────────────┘            └──────────────┘
//!        │ first failure halts
//!        ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ diagnostics: full-page screenshot + console.log (best effort) │
//! └──────────────────────────────────────────────────────────────┘
//!        │
//!        ▼
//!     Verdict
//! ```

use crate::driver::{CaptureScope, Driver};
use crate::locator::BoundingBox;
use crate::resolver::{not_found, Resolution, Resolver};
use crate::result::{HarnessError, HarnessResult};
use crate::scenario::Scenario;
use crate::session::Session;
use crate::step::{ScreenshotScope, Step};
use crate::verdict::{
    Artifact, ArtifactKind, Failure, StepRecord, Verdict, VerdictRecorder, VerdictStatus,
};
use crate::wait::{wait_for_load_state, LoadState, WaitOptions, DEFAULT_POLL_INTERVAL_MS};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Default per-step resolution timeout
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 5_000;

/// Default directory for diagnostic artifacts
pub const DEFAULT_ARTIFACT_DIR: &str = "vigia-artifacts";

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Base URL for scenarios that do not set one
    pub base_url: Option<String>,
    /// Directory for diagnostic screenshots and console logs
    pub artifact_dir: PathBuf,
    /// Resolution timeout for steps without their own
    pub default_timeout: Duration,
    /// Locator poll interval
    pub poll_interval: Duration,
    /// Navigation timeout; the session's when `None`
    pub navigation_timeout: Option<Duration>,
    /// Capture diagnostics on failure
    pub diagnostics: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            default_timeout: Duration::from_millis(DEFAULT_STEP_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            navigation_timeout: None,
            diagnostics: true,
        }
    }
}

impl RunnerOptions {
    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set artifact directory
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Set default step timeout
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = Some(timeout);
        self
    }

    /// Enable or disable failure diagnostics
    #[must_use]
    pub const fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }
}

/// Executes scenarios against a session
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    options: RunnerOptions,
    resolver: Resolver,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new(RunnerOptions::default())
    }
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub const fn new(options: RunnerOptions) -> Self {
        let resolver = Resolver::new(options.poll_interval);
        Self { options, resolver }
    }

    /// Options in use
    #[must_use]
    pub const fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Run every step of `scenario` in order and produce its verdict
    ///
    /// Never fails: step errors and panics become verdict fields.
    /// Diagnostics go to `artifact_dir/<slug>`.
    pub async fn run<D: Driver>(&self, session: &Session<D>, scenario: &Scenario) -> Verdict {
        self.run_in(session, scenario, &scenario.slug()).await
    }

    /// Like [`run`](Self::run), with diagnostics under `artifact_dir/<dir_name>`
    pub async fn run_in<D: Driver>(
        &self,
        session: &Session<D>,
        scenario: &Scenario,
        dir_name: &str,
    ) -> Verdict {
        let span = info_span!("scenario", name = %scenario.name);
        let diagnostics = self.options.artifact_dir.join(dir_name);
        self.run_steps(session, scenario, &diagnostics)
            .instrument(span)
            .await
    }

    async fn run_steps<D: Driver>(
        &self,
        session: &Session<D>,
        scenario: &Scenario,
        diagnostics: &Path,
    ) -> Verdict {
        let driver = session.driver();
        let mut recorder = VerdictRecorder::new(&scenario.name, scenario.steps.len());
        info!(steps = scenario.steps.len(), "scenario started");

        if let Err(e) = self.setup(session, scenario).await {
            warn!(error = %e, "scenario setup failed");
            recorder.fail(
                VerdictStatus::for_error(&e),
                Failure::from_error(None, None, &e),
            );
        } else {
            for (index, step) in scenario.steps.iter().enumerate() {
                if !self.run_step(session, scenario, index, step, &mut recorder).await {
                    break;
                }
            }
        }

        if recorder.has_failed() && self.options.diagnostics {
            self.capture_diagnostics(driver, diagnostics, &mut recorder).await;
        }
        let console = driver.console_messages();
        if recorder.has_failed() && !console.is_empty() {
            let log: String = console.iter().map(|m| format!("{m}\n")).collect();
            recorder.add_artifact(Artifact::new(
                diagnostics.join("console.log"),
                ArtifactKind::ConsoleLog,
                log.into_bytes(),
            ));
        }

        let verdict = recorder.finish(console);
        info!(status = %verdict.status(), elapsed_ms = verdict.elapsed().as_millis() as u64, "scenario finished");
        verdict
    }

    /// Run one step; `false` halts the scenario
    async fn run_step<D: Driver>(
        &self,
        session: &Session<D>,
        scenario: &Scenario,
        index: usize,
        step: &Step,
        recorder: &mut VerdictRecorder,
    ) -> bool {
        let start = Instant::now();
        debug!(step = index + 1, action = step.name(), "{step}");
        let outcome = AssertUnwindSafe(self.execute(session, scenario, step))
            .catch_unwind()
            .await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(artifact)) => {
                if let Some(artifact) = artifact {
                    recorder.add_artifact(artifact);
                }
                recorder.record_step(StepRecord::new(index, step, VerdictStatus::Passed, elapsed));
                true
            }
            Ok(Err(e)) => {
                let status = VerdictStatus::for_error(&e);
                warn!(step = index + 1, action = step.name(), error = %e, "step failed");
                recorder.record_step(StepRecord::new(index, step, status, elapsed));
                recorder.fail(status, Failure::from_error(Some(index), Some(step), &e));
                false
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(step = index + 1, action = step.name(), panic = %message, "step panicked");
                recorder.record_step(StepRecord::new(index, step, VerdictStatus::Errored, elapsed));
                recorder.fail(VerdictStatus::Errored, Failure::panic(index, step, message));
                false
            }
        }
    }

    async fn setup<D: Driver>(&self, session: &Session<D>, scenario: &Scenario) -> HarnessResult<()> {
        let driver = session.driver();
        if let Some(seed) = scenario.seed_script(self.options.base_url.as_deref())? {
            driver.add_init_script(&seed).await?;
        }
        for script in &scenario.init_scripts {
            driver.add_init_script(script).await?;
        }
        if scenario.viewport.is_some() || scenario.device_scale_factor.is_some() {
            let config = scenario.session_config(session.config());
            driver
                .set_viewport(
                    config.viewport.width,
                    config.viewport.height,
                    config.device_scale_factor,
                )
                .await?;
        }
        Ok(())
    }

    async fn execute<D: Driver>(
        &self,
        session: &Session<D>,
        scenario: &Scenario,
        step: &Step,
    ) -> HarnessResult<Option<Artifact>> {
        let driver = session.driver();
        let timeout = step.timeout().unwrap_or(self.options.default_timeout);

        match step {
            Step::Navigate {
                url, wait_until, ..
            } => {
                let target = scenario.resolve_url(url, self.options.base_url.as_deref())?;
                if *wait_until == LoadState::None {
                    driver.start_navigation(&target).await?;
                } else {
                    driver.navigate(&target).await?;
                    self.wait_for_load(session, step, *wait_until).await?;
                }
            }
            Step::Reload { wait_until, .. } => {
                if *wait_until == LoadState::None {
                    driver.start_reload().await?;
                } else {
                    driver.reload().await?;
                    self.wait_for_load(session, step, *wait_until).await?;
                }
            }
            Step::Click { locator, .. } => {
                let handle = self.resolver.resolve(driver, locator, timeout).await?;
                if !handle.snapshot().enabled {
                    return Err(HarnessError::action(locator.to_string(), "element is disabled"));
                }
                driver.click(handle.path()).await?;
            }
            Step::Fill { locator, value, .. } => {
                let handle = self.resolver.resolve(driver, locator, timeout).await?;
                let snapshot = handle.snapshot();
                if !snapshot.enabled {
                    return Err(HarnessError::action(locator.to_string(), "element is disabled"));
                }
                if !snapshot.editable {
                    return Err(HarnessError::action(
                        locator.to_string(),
                        format!("<{}> is not editable", snapshot.tag),
                    ));
                }
                driver.fill(handle.path(), value).await?;
            }
            Step::WaitForVisible { locator, .. } => {
                self.resolver.resolve(driver, locator, timeout).await?;
            }
            Step::WaitForText { locator, text, .. } => {
                let resolution = self
                    .resolver
                    .resolve_when(driver, locator, timeout, |s| s.visible && text.matches(&s.text))
                    .await?;
                if let Resolution::Unsatisfied { elapsed, last } = resolution {
                    return Err(match &last.element {
                        Some(element) if element.visible => HarnessError::assertion(format!(
                            "{locator}: text {text} did not appear within {}ms (last text {:?})",
                            elapsed.as_millis(),
                            excerpt(&element.text)
                        )),
                        _ => not_found(locator, elapsed, &last),
                    });
                }
            }
            Step::AssertText { locator, text, .. } => {
                let handle = self.resolver.resolve(driver, locator, timeout).await?;
                if !text.matches(handle.text()) {
                    return Err(HarnessError::assertion(format!(
                        "{locator}: expected text {text}, found {:?}",
                        excerpt(handle.text())
                    )));
                }
            }
            Step::AssertNotText { locator, text, .. } => {
                let handle = self.resolver.resolve(driver, locator, timeout).await?;
                if text.matches(handle.text()) {
                    return Err(HarnessError::assertion(format!(
                        "{locator}: unexpected text {text} is present"
                    )));
                }
            }
            Step::AssertEnabled { locator, .. } => {
                let handle = self.resolver.resolve(driver, locator, timeout).await?;
                if !handle.snapshot().enabled {
                    return Err(HarnessError::assertion(format!("{locator}: element is disabled")));
                }
            }
            Step::Screenshot { path, scope, .. } => {
                let capture = match scope {
                    ScreenshotScope::FullPage => CaptureScope::FullPage,
                    ScreenshotScope::Viewport => CaptureScope::Viewport,
                    ScreenshotScope::Element(locator) => {
                        let handle = self.resolver.resolve(driver, locator, timeout).await?;
                        let bounds = handle
                            .snapshot()
                            .bounding_box
                            .filter(BoundingBox::has_area)
                            .ok_or_else(|| {
                                HarnessError::screenshot(format!("{locator} has no visible area"))
                            })?;
                        CaptureScope::Clip(bounds)
                    }
                };
                let bytes = driver.screenshot(capture).await?;
                return Ok(Some(Artifact::new(path.clone(), ArtifactKind::Screenshot, bytes)));
            }
            Step::Evaluate { script, expect } => {
                let value = driver.evaluate(script).await?;
                if let Some(expected) = expect {
                    if value != *expected {
                        return Err(HarnessError::assertion(format!(
                            "script returned {value}, expected {expected}"
                        )));
                    }
                }
            }
            Step::SetViewport {
                width,
                height,
                device_scale_factor,
            } => {
                let dsf = device_scale_factor.unwrap_or(session.config().device_scale_factor);
                driver.set_viewport(*width, *height, dsf).await?;
            }
        }
        Ok(None)
    }

    async fn wait_for_load<D: Driver>(
        &self,
        session: &Session<D>,
        step: &Step,
        state: LoadState,
    ) -> HarnessResult<()> {
        let timeout = step
            .timeout()
            .or(self.options.navigation_timeout)
            .unwrap_or_else(|| session.config().navigation_timeout());
        let options = WaitOptions::new()
            .with_timeout(timeout)
            .with_poll_interval(self.options.poll_interval);
        wait_for_load_state(session.driver(), state, &options).await
    }

    async fn capture_diagnostics<D: Driver>(
        &self,
        driver: &D,
        dir: &Path,
        recorder: &mut VerdictRecorder,
    ) {
        let name = match recorder.failed_step() {
            Some(index) => format!("failure-step-{}.png", index + 1),
            None => "failure-setup.png".to_string(),
        };
        let capture = AssertUnwindSafe(driver.screenshot(CaptureScope::FullPage))
            .catch_unwind()
            .await;
        match capture {
            Ok(Ok(bytes)) => recorder.add_artifact(Artifact::new(
                dir.join(name),
                ArtifactKind::Diagnostic,
                bytes,
            )),
            Ok(Err(e)) => warn!(error = %e, "diagnostic screenshot failed"),
            Err(_) => warn!("diagnostic screenshot panicked"),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 120;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}…")
    }
}
