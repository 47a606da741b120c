//! Runs several scenarios, each in its own session.

use crate::driver::Launcher;
use crate::result::{HarnessError, HarnessResult};
use crate::runner::ScenarioRunner;
use crate::scenario::Scenario;
use crate::session::{SessionConfig, SessionManager};
use crate::verdict::Verdict;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// Verdicts of a suite run, plus the error that stopped it early
///
/// Verdicts of scenarios that finished before the abort are kept so their
/// artifacts and summary lines can still be reported.
#[derive(Debug)]
pub struct SuiteOutcome {
    /// Verdicts in scenario order; scenarios never started are absent
    pub verdicts: Vec<Verdict>,
    /// First session acquisition error, if the run was cut short
    pub aborted: Option<HarnessError>,
}

impl SuiteOutcome {
    /// Whether every scenario got a session
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.aborted.is_none()
    }

    /// Verdicts, or the abort error (dropping finished verdicts)
    pub fn into_result(self) -> HarnessResult<Vec<Verdict>> {
        match self.aborted {
            Some(e) => Err(e),
            None => Ok(self.verdicts),
        }
    }
}

/// Runs scenarios with at most `jobs` sessions alive at once
///
/// Verdicts come back in scenario order. A session that cannot be acquired
/// stops the run: scenarios not yet started are skipped, finished verdicts
/// are kept and the error is reported in [`SuiteOutcome::aborted`].
#[derive(Debug, Clone)]
pub struct SuiteRunner<L: Launcher> {
    manager: SessionManager<L>,
    runner: ScenarioRunner,
    session: SessionConfig,
    jobs: usize,
}

impl<L: Launcher> SuiteRunner<L> {
    /// Sequential runner
    #[must_use]
    pub const fn new(launcher: L, runner: ScenarioRunner, session: SessionConfig) -> Self {
        Self {
            manager: SessionManager::new(launcher),
            runner,
            session,
            jobs: 1,
        }
    }

    /// Allow `jobs` scenarios in parallel (at least one)
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Session manager in use
    #[must_use]
    pub const fn manager(&self) -> &SessionManager<L> {
        &self.manager
    }

    /// Run one scenario in a fresh session
    pub async fn run_scenario(&self, scenario: &Scenario) -> HarnessResult<Verdict> {
        self.run_in(scenario, scenario.slug()).await
    }

    async fn run_in(&self, scenario: &Scenario, dir_name: String) -> HarnessResult<Verdict> {
        let config = scenario.session_config(&self.session);
        let runner = self.runner.clone();
        let owned = scenario.clone();
        self.manager
            .with_session(&config, &scenario.routes, move |session| {
                async move { runner.run_in(session, &owned, &dir_name).await }.boxed()
            })
            .await
    }

    /// Run every scenario
    pub async fn run(&self, scenarios: &[Scenario]) -> SuiteOutcome {
        let abort = AtomicBool::new(false);
        info!(scenarios = scenarios.len(), jobs = self.jobs, "suite started");

        let results: Vec<Option<HarnessResult<Verdict>>> =
            stream::iter(scenarios.iter().zip(diagnostic_dir_names(scenarios)))
                .map(|(scenario, dir_name)| {
                    let abort = &abort;
                    async move {
                        if abort.load(Ordering::SeqCst) {
                            return None;
                        }
                        let result = self.run_in(scenario, dir_name).await;
                        if let Err(e) = &result {
                            error!(scenario = %scenario.name, error = %e, "aborting run");
                            abort.store(true, Ordering::SeqCst);
                        }
                        Some(result)
                    }
                })
                .buffered(self.jobs)
                .collect()
                .await;

        let mut outcome = SuiteOutcome {
            verdicts: Vec::with_capacity(scenarios.len()),
            aborted: None,
        };
        for result in results.into_iter().flatten() {
            match result {
                Ok(verdict) => outcome.verdicts.push(verdict),
                Err(e) => {
                    outcome.aborted.get_or_insert(e);
                }
            }
        }
        outcome
    }
}

/// One diagnostics directory per scenario: the slug, suffixed `-2`, `-3`, ...
/// when an earlier scenario in the run already uses it
pub(crate) fn diagnostic_dir_names(scenarios: &[Scenario]) -> Vec<String> {
    let mut used = HashSet::new();
    scenarios
        .iter()
        .map(|scenario| {
            let slug = scenario.slug();
            let mut name = slug.clone();
            let mut n = 2;
            while used.contains(&name) {
                name = format!("{slug}-{n}");
                n += 1;
            }
            used.insert(name.clone());
            name
        })
        .collect()
}
