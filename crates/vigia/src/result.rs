//! Result and error types for Vigia.

use std::time::Duration;
use thiserror::Error;

/// Result type for Vigia operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while driving a scenario
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Browser engine unavailable or failed to launch
    #[error("Browser environment unavailable: {message}")]
    Environment {
        /// Error message
        message: String,
    },

    /// Locator did not resolve within its timeout
    #[error("Element not found: {locator} (waited {}ms, last saw {last_seen_count} match(es))", .elapsed.as_millis())]
    NotFound {
        /// Human-readable locator description
        locator: String,
        /// Time spent polling
        elapsed: Duration,
        /// Match count seen on the final probe
        last_seen_count: usize,
    },

    /// Element resolved but is not actionable
    #[error("Element not actionable: {locator}: {reason}")]
    Action {
        /// Human-readable locator description
        locator: String,
        /// Why the action was refused
        reason: String,
    },

    /// Resolved state does not match the expectation
    #[error("Assertion failed: {message}")]
    Assertion {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Page script evaluation failed
    #[error("Script evaluation failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Screenshot capture failed
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Driver transport or protocol failure
    #[error("Browser protocol error: {message}")]
    Protocol {
        /// Error message
        message: String,
    },

    /// Scenario or step rejected at construction time
    #[error("Invalid scenario: {message}")]
    InvalidScenario {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarnessError {
    /// Create an environment error
    #[must_use]
    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment {
            message: message.into(),
        }
    }

    /// Create an action error
    #[must_use]
    pub fn action(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Action {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Create an assertion error
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    /// Create a script error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Create a screenshot error
    #[must_use]
    pub fn screenshot(message: impl Into<String>) -> Self {
        Self::Screenshot {
            message: message.into(),
        }
    }

    /// Create a protocol error
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create an invalid-scenario error
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidScenario {
            message: message.into(),
        }
    }

    /// Classify the error for verdict reporting
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Environment { .. } => ErrorKind::Environment,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Action { .. } => ErrorKind::Action,
            Self::Assertion { .. } => ErrorKind::Assertion,
            Self::Navigation { .. } => ErrorKind::Navigation,
            Self::Screenshot { .. } => ErrorKind::Screenshot,
            Self::Io(_) => ErrorKind::Io,
            Self::Script { .. } => ErrorKind::Script,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::InvalidScenario { .. } | Self::Json(_) | Self::Yaml(_) => ErrorKind::Invalid,
        }
    }

    /// Whether this error is a verification failure of the page under test
    /// rather than a fault of the harness or the driver
    #[must_use]
    pub const fn is_verification_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::Action
                | ErrorKind::Assertion
                | ErrorKind::Navigation
                | ErrorKind::Screenshot
        )
    }
}

/// Coarse error classification carried by verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Browser unavailable
    Environment,
    /// Locator unresolved
    NotFound,
    /// Element not actionable
    Action,
    /// Expectation mismatch
    Assertion,
    /// Navigation failure
    Navigation,
    /// Screenshot capture failure
    Screenshot,
    /// Artifact write failure
    Io,
    /// Page script failure
    Script,
    /// Driver transport failure
    Protocol,
    /// Malformed scenario input
    Invalid,
    /// Step panicked
    Panic,
}

impl ErrorKind {
    /// Short label for summary lines
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::NotFound => "not-found",
            Self::Action => "action",
            Self::Assertion => "assertion",
            Self::Navigation => "navigation",
            Self::Screenshot => "screenshot",
            Self::Io => "io",
            Self::Script => "script",
            Self::Protocol => "protocol",
            Self::Invalid => "invalid",
            Self::Panic => "panic",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_locator_and_wait() {
        let err = HarnessError::NotFound {
            locator: "role=button name~\"Abrir chat\"".to_string(),
            elapsed: Duration::from_millis(1000),
            last_seen_count: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("Abrir chat"));
        assert!(msg.contains("1000ms"));
        assert!(msg.contains("0 match"));
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            HarnessError::environment("no chromium").kind(),
            ErrorKind::Environment
        );
        assert_eq!(HarnessError::assertion("x").kind(), ErrorKind::Assertion);
        assert_eq!(HarnessError::invalid("x").kind(), ErrorKind::Invalid);
    }

    #[test]
    fn test_verification_failure_split() {
        assert!(HarnessError::action("css=button", "disabled").is_verification_failure());
        assert!(HarnessError::assertion("x").is_verification_failure());
        assert!(!HarnessError::protocol("socket closed").is_verification_failure());
        assert!(!HarnessError::script("ReferenceError").is_verification_failure());
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: HarnessError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("I/O"));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not-found");
        assert_eq!(ErrorKind::Panic.label(), "panic");
    }
}
