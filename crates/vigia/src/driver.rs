//! Driver - Abstract Browser Automation Trait
//!
//! The harness talks to a browser only through [`Driver`]. Two
//! implementations ship with the crate:
//!
//! - `ChromiumDriver` (feature `browser`) drives Chromium over CDP via
//!   chromiumoxide;
//! - [`MockDriver`](crate::mock::MockDriver) evaluates locators against an
//!   in-memory DOM on the tokio clock, for tests.
//!
//! A [`Launcher`] produces one driver per session.

use crate::locator::{BoundingBox, LocatorSpec, NodePath, Probe};
use crate::network::RouteTable;
use crate::result::HarnessResult;
use crate::session::SessionConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Tracing target for forwarded browser console messages
pub const CONSOLE_TARGET: &str = "vigia::console";

/// What a screenshot covers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureScope {
    /// The whole scrollable page
    FullPage,
    /// The current viewport
    Viewport,
    /// A region in top-level CSS pixels
    Clip(BoundingBox),
}

/// Abstract driver trait for browser automation
///
/// Every method takes `&self`; implementations synchronize internally so a
/// session can be shared by reference with the runner.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate the page to an absolute URL
    ///
    /// May block until the driver's own notion of "loaded".
    async fn navigate(&self, url: &str) -> HarnessResult<()>;

    /// Reload the current page
    async fn reload(&self) -> HarnessResult<()>;

    /// Start a navigation and return once it is committed, without waiting
    /// for any load event
    async fn start_navigation(&self, url: &str) -> HarnessResult<()> {
        self.navigate(url).await
    }

    /// Start a reload without waiting for any load event
    async fn start_reload(&self) -> HarnessResult<()> {
        self.reload().await
    }

    /// Current top-level URL
    async fn current_url(&self) -> HarnessResult<String>;

    /// `document.readyState` of the top-level document
    async fn ready_state(&self) -> HarnessResult<String>;

    /// Number of resource-timing entries seen so far
    async fn resource_count(&self) -> HarnessResult<usize>;

    /// Evaluate a locator once against the current DOM
    async fn probe(&self, spec: &LocatorSpec) -> HarnessResult<Probe>;

    /// Click the center of a node
    async fn click(&self, path: &NodePath) -> HarnessResult<()>;

    /// Replace the value of an editable node
    async fn fill(&self, path: &NodePath, value: &str) -> HarnessResult<()>;

    /// Evaluate a script in the page and return its JSON value
    async fn evaluate(&self, script: &str) -> HarnessResult<serde_json::Value>;

    /// Install a script that runs before any page script on every navigation
    async fn add_init_script(&self, script: &str) -> HarnessResult<()>;

    /// Override viewport metrics
    async fn set_viewport(&self, width: u32, height: u32, device_scale_factor: f64)
        -> HarnessResult<()>;

    /// Capture a PNG
    async fn screenshot(&self, scope: CaptureScope) -> HarnessResult<Vec<u8>>;

    /// Console messages captured so far
    fn console_messages(&self) -> Vec<ConsoleMessage>;

    /// Close the page and the browser
    async fn close(&self) -> HarnessResult<()>;
}

/// Produces a fresh driver for each session
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Driver type produced
    type Driver: Driver + 'static;

    /// Start a browser with `routes` installed before the first navigation
    async fn launch(&self, config: &SessionConfig, routes: &RouteTable)
        -> HarnessResult<Self::Driver>;
}

// =============================================================================
// CONSOLE CAPTURE
// =============================================================================

/// Console message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    /// console.log / console.info
    Log,
    /// console.debug
    Debug,
    /// console.warn
    Warning,
    /// console.error or uncaught exception
    Error,
}

impl ConsoleLevel {
    /// Map a CDP console type string
    #[must_use]
    pub fn from_cdp(kind: &str) -> Self {
        match kind {
            "debug" | "trace" => Self::Debug,
            "warning" | "warn" => Self::Warning,
            "error" | "assert" => Self::Error,
            _ => Self::Log,
        }
    }

    /// Get string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Debug => "debug",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One browser console message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Severity
    pub level: ConsoleLevel,
    /// Rendered text
    pub text: String,
}

impl ConsoleMessage {
    /// Create a message
    #[must_use]
    pub fn new(level: ConsoleLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

impl fmt::Display for ConsoleMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.text)
    }
}

/// Collects console messages for one session and forwards them to tracing
///
/// Disabled sinks drop everything.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    enabled: bool,
    messages: Mutex<Vec<ConsoleMessage>>,
}

impl ConsoleSink {
    /// Create a sink
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Whether messages are being captured
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record and forward one message
    pub fn record(&self, message: ConsoleMessage) {
        if !self.enabled {
            return;
        }
        match message.level {
            ConsoleLevel::Error => tracing::error!(target: CONSOLE_TARGET, "{}", message.text),
            ConsoleLevel::Warning => tracing::warn!(target: CONSOLE_TARGET, "{}", message.text),
            ConsoleLevel::Debug => tracing::debug!(target: CONSOLE_TARGET, "{}", message.text),
            ConsoleLevel::Log => tracing::info!(target: CONSOLE_TARGET, "{}", message.text),
        }
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }

    /// Snapshot of everything recorded
    #[must_use]
    pub fn messages(&self) -> Vec<ConsoleMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod console_tests {
        use super::*;

        #[test]
        fn test_level_from_cdp() {
            assert_eq!(ConsoleLevel::from_cdp("warning"), ConsoleLevel::Warning);
            assert_eq!(ConsoleLevel::from_cdp("error"), ConsoleLevel::Error);
            assert_eq!(ConsoleLevel::from_cdp("info"), ConsoleLevel::Log);
            assert_eq!(ConsoleLevel::from_cdp("debug"), ConsoleLevel::Debug);
        }

        #[test]
        fn test_disabled_sink_drops() {
            let sink = ConsoleSink::new(false);
            sink.record(ConsoleMessage::new(ConsoleLevel::Log, "hola"));
            assert!(sink.messages().is_empty());
        }

        #[test]
        fn test_enabled_sink_keeps_order() {
            let sink = ConsoleSink::new(true);
            sink.record(ConsoleMessage::new(ConsoleLevel::Log, "one"));
            sink.record(ConsoleMessage::new(ConsoleLevel::Error, "two"));
            let messages = sink.messages();
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[1].to_string(), "[error] two");
        }
    }
}
