//! Locator resolution with a bounded polling wait.

use crate::driver::Driver;
use crate::locator::{ElementHandle, ElementSnapshot, LocatorSpec, Probe};
use crate::result::{HarnessError, HarnessResult};
use crate::wait::{poll_until, Poll, WaitOptions, WaitOutcome, DEFAULT_POLL_INTERVAL_MS};
use std::time::Duration;

/// Result of polling a locator against a predicate
#[derive(Debug, Clone)]
pub enum Resolution {
    /// An element satisfied the predicate
    Found(ElementHandle),
    /// The deadline passed first
    Unsatisfied {
        /// Time spent polling
        elapsed: Duration,
        /// What the final probe saw
        last: Probe,
    },
}

/// Resolves [`LocatorSpec`]s through a [`Driver`]
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    poll_interval: Duration,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl Resolver {
    /// Create a resolver with a fixed poll interval
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Resolve to a visible element or fail with `NotFound`
    pub async fn resolve<D: Driver + ?Sized>(
        &self,
        driver: &D,
        spec: &LocatorSpec,
        timeout: Duration,
    ) -> HarnessResult<ElementHandle> {
        match self.resolve_when(driver, spec, timeout, |s| s.visible).await? {
            Resolution::Found(handle) => Ok(handle),
            Resolution::Unsatisfied { elapsed, last } => Err(not_found(spec, elapsed, &last)),
        }
    }

    /// Poll until the indexed candidate satisfies `predicate`
    ///
    /// Driver errors abort immediately; they are not retried.
    pub async fn resolve_when<D, P>(
        &self,
        driver: &D,
        spec: &LocatorSpec,
        timeout: Duration,
        predicate: P,
    ) -> HarnessResult<Resolution>
    where
        D: Driver + ?Sized,
        P: Fn(&ElementSnapshot) -> bool,
    {
        let options = WaitOptions::new()
            .with_timeout(timeout)
            .with_poll_interval(self.poll_interval);
        let predicate = &predicate;

        let outcome = poll_until(&options, || async move {
            let probe = driver.probe(spec).await?;
            Ok(match probe.element.as_ref() {
                Some(element) if predicate(element) => Poll::Ready(element.clone()),
                _ => Poll::Pending(probe),
            })
        })
        .await?;

        Ok(match outcome {
            WaitOutcome::Ready { value, elapsed } => {
                tracing::debug!(locator = %spec, path = %value.path, ?elapsed, "resolved");
                Resolution::Found(ElementHandle::new(spec.clone(), value))
            }
            WaitOutcome::TimedOut { elapsed, last } => {
                tracing::debug!(locator = %spec, ?elapsed, "unresolved at deadline");
                Resolution::Unsatisfied {
                    elapsed,
                    last: last.unwrap_or_default(),
                }
            }
        })
    }
}

/// Build the `NotFound` error for a probe that never satisfied its predicate
#[must_use]
pub fn not_found(spec: &LocatorSpec, elapsed: Duration, last: &Probe) -> HarnessError {
    let mut locator = spec.to_string();
    if last.frames_resolved < spec.frames().len() {
        let hop = &spec.frames()[last.frames_resolved];
        locator.push_str(&format!(" ({hop} not found)"));
    } else if last.element.as_ref().is_some_and(|e| !e.visible) {
        locator.push_str(" (present but not visible)");
    }
    HarnessError::NotFound {
        locator,
        elapsed,
        last_seen_count: last.count,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::locator::{FrameHop, NodePath, PathStep};

    fn snapshot(visible: bool) -> ElementSnapshot {
        ElementSnapshot {
            path: NodePath::new(vec![PathStep::Child(0)]),
            tag: "button".into(),
            text: "Abrir chat".into(),
            visible,
            enabled: true,
            editable: false,
            bounding_box: None,
        }
    }

    #[test]
    fn test_not_found_names_missing_frame() {
        let spec = LocatorSpec::css("button").in_frame(FrameHop::UrlContains("/iframe".into()));
        let err = not_found(&spec, Duration::from_millis(1000), &Probe::empty(0));
        let msg = err.to_string();
        assert!(msg.contains("frame[url~\"/iframe\"] not found"), "{msg}");
        assert!(msg.contains("1000ms"));
    }

    #[test]
    fn test_not_found_reports_hidden_candidate() {
        let spec = LocatorSpec::css("button");
        let probe = Probe {
            frames_resolved: 0,
            count: 1,
            element: Some(snapshot(false)),
        };
        match not_found(&spec, Duration::from_millis(50), &probe) {
            HarnessError::NotFound {
                locator,
                last_seen_count,
                ..
            } => {
                assert!(locator.contains("present but not visible"));
                assert_eq!(last_seen_count, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_default_interval() {
        assert_eq!(Resolver::default().poll_interval(), Duration::from_millis(50));
    }
}
