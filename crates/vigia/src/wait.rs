//! Bounded polling and page load states.
//!
//! Every wait in the harness is a poll-until-predicate with a wall-clock
//! deadline. Polls run on the tokio clock so tests can pause and advance
//! time deterministically. The last probe is taken exactly at the deadline.

use crate::driver::Driver;
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for navigation waits (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Network idle threshold (500ms without new resources)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Page load states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Wait for the `load` event to fire
    #[default]
    Load,
    /// Wait for `DOMContentLoaded` event
    DomContentLoaded,
    /// Wait for load, then no new resource entries for 500ms
    NetworkIdle,
    /// Do not wait
    None,
}

impl LoadState {
    /// Get the event name for this load state
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkIdle => "networkidle",
            Self::None => "none",
        }
    }

    /// Whether `document.readyState` satisfies this state
    #[must_use]
    pub fn ready_state_reached(&self, ready_state: &str) -> bool {
        match self {
            Self::Load | Self::NetworkIdle => ready_state == "complete",
            Self::DomContentLoaded => matches!(ready_state, "interactive" | "complete"),
            Self::None => true,
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout
    pub timeout: Duration,
    /// Polling interval
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Outcome of one poll
#[derive(Debug, Clone, PartialEq)]
pub enum Poll<T, S> {
    /// Condition satisfied
    Ready(T),
    /// Not yet; carries the state observed
    Pending(S),
}

/// Outcome of a bounded wait
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome<T, S> {
    /// Condition satisfied
    Ready {
        /// Value produced by the satisfying poll
        value: T,
        /// Time spent
        elapsed: Duration,
    },
    /// Deadline reached
    TimedOut {
        /// Time spent
        elapsed: Duration,
        /// State observed by the final poll
        last: Option<S>,
    },
}

/// Poll `check` until it is ready or `options.timeout` elapses
///
/// Errors returned by `check` abort the wait immediately.
pub async fn poll_until<T, S, F, Fut>(
    options: &WaitOptions,
    mut check: F,
) -> HarnessResult<WaitOutcome<T, S>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Poll<T, S>>>,
{
    let start = Instant::now();
    let deadline = start + options.timeout;
    loop {
        let last = match check().await? {
            Poll::Ready(value) => {
                return Ok(WaitOutcome::Ready {
                    value,
                    elapsed: start.elapsed(),
                })
            }
            Poll::Pending(state) => state,
        };
        let now = Instant::now();
        if now >= deadline {
            return Ok(WaitOutcome::TimedOut {
                elapsed: now - start,
                last: Some(last),
            });
        }
        tokio::time::sleep(options.poll_interval.min(deadline - now)).await;
    }
}

/// Wait until the page reaches `state`
pub async fn wait_for_load_state<D: Driver + ?Sized>(
    driver: &D,
    state: LoadState,
    options: &WaitOptions,
) -> HarnessResult<()> {
    if state == LoadState::None {
        return Ok(());
    }
    let start = Instant::now();
    let outcome = poll_until(options, || async {
        let ready = driver.ready_state().await?;
        Ok(if state.ready_state_reached(&ready) {
            Poll::Ready(())
        } else {
            Poll::Pending(ready)
        })
    })
    .await?;

    if let WaitOutcome::TimedOut { last, .. } = outcome {
        return Err(load_timeout(driver, state, options, last).await);
    }

    if state == LoadState::NetworkIdle {
        let remaining = options.timeout.saturating_sub(start.elapsed());
        wait_for_network_idle(driver, &options.with_timeout(remaining)).await?;
    }
    Ok(())
}

async fn load_timeout<D: Driver + ?Sized>(
    driver: &D,
    state: LoadState,
    options: &WaitOptions,
    last: Option<String>,
) -> HarnessError {
    HarnessError::Navigation {
        url: driver.current_url().await.unwrap_or_default(),
        message: format!(
            "'{state}' not reached within {}ms (readyState {})",
            options.timeout.as_millis(),
            last.unwrap_or_else(|| "unknown".to_string())
        ),
    }
}

/// Wait until no new resource entries appear for the idle threshold
pub async fn wait_for_network_idle<D: Driver + ?Sized>(
    driver: &D,
    options: &WaitOptions,
) -> HarnessResult<()> {
    let threshold = Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS);
    let mut seen = driver.resource_count().await?;
    let mut quiet_since = Instant::now();
    let deadline = quiet_since + options.timeout;

    loop {
        let count = driver.resource_count().await?;
        let now = Instant::now();
        if count != seen {
            seen = count;
            quiet_since = now;
        } else if now - quiet_since >= threshold {
            return Ok(());
        }
        if now >= deadline {
            return Err(HarnessError::Navigation {
                url: driver.current_url().await.unwrap_or_default(),
                message: format!(
                    "network did not go idle within {}ms",
                    options.timeout.as_millis()
                ),
            });
        }
        tokio::time::sleep(options.poll_interval.min(deadline - now)).await;
    }
}
