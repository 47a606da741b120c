//! Harness configuration file (`vigia.yaml`).

use crate::result::{HarnessError, HarnessResult};
use crate::runner::{RunnerOptions, DEFAULT_ARTIFACT_DIR, DEFAULT_STEP_TIMEOUT_MS};
use crate::session::SessionConfig;
use crate::wait::DEFAULT_POLL_INTERVAL_MS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File names looked up by [`HarnessConfig::discover`], in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["vigia.yaml", "vigia.yml"];

/// Run-wide settings
///
/// ```yaml
/// base_url: http://localhost:5173
/// artifact_dir: target/vigia
/// jobs: 2
/// session:
///   viewport: { width: 1280, height: 800 }
///   console_logging: true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Base URL of the application under test
    pub base_url: Option<String>,
    /// Directory for diagnostic artifacts
    pub artifact_dir: PathBuf,
    /// Resolution timeout for steps without their own
    pub default_timeout_ms: u64,
    /// Locator poll interval
    pub poll_interval_ms: u64,
    /// Scenarios run in parallel
    pub jobs: usize,
    /// Capture a screenshot and console log on failure
    pub diagnostics: bool,
    /// Where to write the JSON run report, if anywhere
    pub report: Option<PathBuf>,
    /// Browser session settings
    pub session: SessionConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            default_timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            jobs: 1,
            diagnostics: true,
            report: None,
            session: SessionConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Parse and validate YAML
    pub fn from_yaml_str(yaml: &str) -> HarnessResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml).map_err(|e| {
            HarnessError::invalid(format!("{}: {e}", path.display()))
        })
    }

    /// Load the first config file found in `dir`, or defaults
    pub fn discover(dir: impl AsRef<Path>) -> HarnessResult<Self> {
        let dir = dir.as_ref();
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
            .map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> HarnessResult<()> {
        if let Some(base) = &self.base_url {
            url::Url::parse(base)
                .map_err(|e| HarnessError::invalid(format!("bad base_url '{base}': {e}")))?;
        }
        if self.poll_interval_ms == 0 {
            return Err(HarnessError::invalid("poll_interval_ms must be positive"));
        }
        if self.jobs == 0 {
            return Err(HarnessError::invalid("jobs must be at least 1"));
        }
        let viewport = self.session.viewport;
        if viewport.width == 0 || viewport.height == 0 {
            return Err(HarnessError::invalid("session viewport has no area"));
        }
        Ok(())
    }

    /// Runner options derived from this config
    #[must_use]
    pub fn runner_options(&self) -> RunnerOptions {
        let mut options = RunnerOptions::default()
            .with_artifact_dir(self.artifact_dir.clone())
            .with_default_timeout(Duration::from_millis(self.default_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_diagnostics(self.diagnostics);
        if let Some(base) = &self.base_url {
            options = options.with_base_url(base.clone());
        }
        options
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::session::Viewport;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.jobs, 1);
        assert!(config.diagnostics);
        assert!(config.validate().is_ok());
        let options = config.runner_options();
        assert_eq!(options.default_timeout, Duration::from_secs(5));
        assert!(options.base_url.is_none());
    }

    #[test]
    fn test_from_yaml() {
        let config = HarnessConfig::from_yaml_str(
            "base_url: http://localhost:5173\njobs: 2\nsession:\n  viewport: { width: 375, height: 667 }\n",
        )
        .unwrap();
        assert_eq!(config.jobs, 2);
        assert_eq!(config.session.viewport, Viewport::new(375, 667));
        assert_eq!(
            config.runner_options().base_url.as_deref(),
            Some("http://localhost:5173")
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(HarnessConfig::from_yaml_str("jobs: 0").is_err());
        assert!(HarnessConfig::from_yaml_str("poll_interval_ms: 0").is_err());
        assert!(HarnessConfig::from_yaml_str("base_url: nope").is_err());
        assert!(HarnessConfig::from_yaml_str("unknown: 1").is_err());
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(HarnessConfig::discover(dir.path()).unwrap(), HarnessConfig::default());
        std::fs::write(dir.path().join("vigia.yml"), "jobs: 4\n").unwrap();
        assert_eq!(HarnessConfig::discover(dir.path()).unwrap().jobs, 4);
    }
}
