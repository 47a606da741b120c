//! Scenario steps.
//!
//! A [`Step`] is one action in a scenario. The YAML form is tagged by
//! `action`:
//!
//! ```yaml
//! - action: click
//!   locator:
//!     frames: [{ url_contains: /iframe }]
//!     role: button
//!     name: Hacer un Reclamo
//! - action: wait_for_text
//!   locator: { css: body }
//!   text: Tipos de Reclamo
//!   timeout_ms: 2000
//! ```

use crate::locator::{LocatorSpec, TextMatch};
use crate::result::{HarnessError, HarnessResult};
use crate::wait::LoadState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Region captured by a screenshot step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotScope {
    /// Whole scrollable page
    #[default]
    FullPage,
    /// Current viewport only
    Viewport,
    /// Bounding box of a resolved element
    Element(LocatorSpec),
}

/// One scenario action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Load a URL, relative to the scenario base URL unless absolute
    Navigate {
        /// Target URL
        url: String,
        /// Load state to wait for
        #[serde(default)]
        wait_until: LoadState,
        /// Override of the navigation timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Reload the current page
    Reload {
        /// Load state to wait for
        #[serde(default)]
        wait_until: LoadState,
        /// Override of the navigation timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Click a visible, enabled element
    Click {
        /// Element to click
        locator: LocatorSpec,
        /// Resolution timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Replace the value of a visible, enabled, editable element
    Fill {
        /// Element to fill
        locator: LocatorSpec,
        /// New value
        value: String,
        /// Resolution timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Wait until an element is visible
    WaitForVisible {
        /// Element to wait for
        locator: LocatorSpec,
        /// Resolution timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Wait until a visible element's text matches
    WaitForText {
        /// Element whose text is read
        locator: LocatorSpec,
        /// Expected text
        text: TextMatch,
        /// Resolution timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Check once, after the scope resolves, that its text matches
    AssertText {
        /// Scope whose text is read
        locator: LocatorSpec,
        /// Expected text
        text: TextMatch,
        /// Resolution timeout for the scope
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Check once, after the scope resolves, that its text does not match
    AssertNotText {
        /// Scope whose text is read
        locator: LocatorSpec,
        /// Forbidden text
        text: TextMatch,
        /// Resolution timeout for the scope
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Check that a visible element is enabled
    AssertEnabled {
        /// Element to check
        locator: LocatorSpec,
        /// Resolution timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Capture a PNG to `path`
    Screenshot {
        /// Output file
        path: PathBuf,
        /// Captured region
        #[serde(default)]
        scope: ScreenshotScope,
        /// Resolution timeout for element scope
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Run a page script, optionally comparing its JSON result
    Evaluate {
        /// Script source
        script: String,
        /// Expected result
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect: Option<serde_json::Value>,
    },
    /// Change the viewport mid-scenario
    SetViewport {
        /// Width in CSS pixels
        width: u32,
        /// Height in CSS pixels
        height: u32,
        /// Device scale factor, session default when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_scale_factor: Option<f64>,
    },
}

impl Step {
    /// Navigate with the default load state
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::Navigate {
            url: url.into(),
            wait_until: LoadState::default(),
            timeout_ms: None,
        }
    }

    /// Reload with the default load state
    #[must_use]
    pub fn reload() -> Self {
        Self::Reload {
            wait_until: LoadState::default(),
            timeout_ms: None,
        }
    }

    /// Click
    #[must_use]
    pub const fn click(locator: LocatorSpec) -> Self {
        Self::Click {
            locator,
            timeout_ms: None,
        }
    }

    /// Fill
    #[must_use]
    pub fn fill(locator: LocatorSpec, value: impl Into<String>) -> Self {
        Self::Fill {
            locator,
            value: value.into(),
            timeout_ms: None,
        }
    }

    /// Wait for visibility
    #[must_use]
    pub const fn wait_for_visible(locator: LocatorSpec) -> Self {
        Self::WaitForVisible {
            locator,
            timeout_ms: None,
        }
    }

    /// Wait for text
    #[must_use]
    pub fn wait_for_text(locator: LocatorSpec, text: impl Into<TextMatch>) -> Self {
        Self::WaitForText {
            locator,
            text: text.into(),
            timeout_ms: None,
        }
    }

    /// Assert text is present
    #[must_use]
    pub fn assert_text(locator: LocatorSpec, text: impl Into<TextMatch>) -> Self {
        Self::AssertText {
            locator,
            text: text.into(),
            timeout_ms: None,
        }
    }

    /// Assert text is absent
    #[must_use]
    pub fn assert_not_text(locator: LocatorSpec, text: impl Into<TextMatch>) -> Self {
        Self::AssertNotText {
            locator,
            text: text.into(),
            timeout_ms: None,
        }
    }

    /// Assert enabled
    #[must_use]
    pub const fn assert_enabled(locator: LocatorSpec) -> Self {
        Self::AssertEnabled {
            locator,
            timeout_ms: None,
        }
    }

    /// Screenshot
    #[must_use]
    pub fn screenshot(path: impl Into<PathBuf>, scope: ScreenshotScope) -> Self {
        Self::Screenshot {
            path: path.into(),
            scope,
            timeout_ms: None,
        }
    }

    /// Evaluate without checking the result
    #[must_use]
    pub fn evaluate(script: impl Into<String>) -> Self {
        Self::Evaluate {
            script: script.into(),
            expect: None,
        }
    }

    /// Evaluate and compare
    #[must_use]
    pub fn evaluate_expecting(script: impl Into<String>, expect: serde_json::Value) -> Self {
        Self::Evaluate {
            script: script.into(),
            expect: Some(expect),
        }
    }

    /// Set viewport
    #[must_use]
    pub const fn set_viewport(width: u32, height: u32) -> Self {
        Self::SetViewport {
            width,
            height,
            device_scale_factor: None,
        }
    }

    /// Override this step's timeout; no effect on steps without one
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if let Some(slot) = self.timeout_slot() {
            *slot = Some(ms);
        }
        self
    }

    /// Override the load state of `navigate` / `reload`
    #[must_use]
    pub fn with_wait_until(mut self, state: LoadState) -> Self {
        if let Self::Navigate { wait_until, .. } | Self::Reload { wait_until, .. } = &mut self {
            *wait_until = state;
        }
        self
    }

    fn timeout_slot(&mut self) -> Option<&mut Option<u64>> {
        match self {
            Self::Navigate { timeout_ms, .. }
            | Self::Reload { timeout_ms, .. }
            | Self::Click { timeout_ms, .. }
            | Self::Fill { timeout_ms, .. }
            | Self::WaitForVisible { timeout_ms, .. }
            | Self::WaitForText { timeout_ms, .. }
            | Self::AssertText { timeout_ms, .. }
            | Self::AssertNotText { timeout_ms, .. }
            | Self::AssertEnabled { timeout_ms, .. }
            | Self::Screenshot { timeout_ms, .. } => Some(timeout_ms),
            Self::Evaluate { .. } | Self::SetViewport { .. } => None,
        }
    }

    /// Explicit timeout, if any
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Navigate { timeout_ms, .. }
            | Self::Reload { timeout_ms, .. }
            | Self::Click { timeout_ms, .. }
            | Self::Fill { timeout_ms, .. }
            | Self::WaitForVisible { timeout_ms, .. }
            | Self::WaitForText { timeout_ms, .. }
            | Self::AssertText { timeout_ms, .. }
            | Self::AssertNotText { timeout_ms, .. }
            | Self::AssertEnabled { timeout_ms, .. }
            | Self::Screenshot { timeout_ms, .. } => timeout_ms.map(Duration::from_millis),
            Self::Evaluate { .. } | Self::SetViewport { .. } => None,
        }
    }

    /// The locator this step resolves, if any
    #[must_use]
    pub fn locator(&self) -> Option<&LocatorSpec> {
        match self {
            Self::Click { locator, .. }
            | Self::Fill { locator, .. }
            | Self::WaitForVisible { locator, .. }
            | Self::WaitForText { locator, .. }
            | Self::AssertText { locator, .. }
            | Self::AssertNotText { locator, .. }
            | Self::AssertEnabled { locator, .. } => Some(locator),
            Self::Screenshot {
                scope: ScreenshotScope::Element(locator),
                ..
            } => Some(locator),
            _ => None,
        }
    }

    /// Action name as written in scenario files
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Reload { .. } => "reload",
            Self::Click { .. } => "click",
            Self::Fill { .. } => "fill",
            Self::WaitForVisible { .. } => "wait_for_visible",
            Self::WaitForText { .. } => "wait_for_text",
            Self::AssertText { .. } => "assert_text",
            Self::AssertNotText { .. } => "assert_not_text",
            Self::AssertEnabled { .. } => "assert_enabled",
            Self::Screenshot { .. } => "screenshot",
            Self::Evaluate { .. } => "evaluate",
            Self::SetViewport { .. } => "set_viewport",
        }
    }

    /// Reject steps that could never run
    pub fn validate(&self) -> HarnessResult<()> {
        if let Some(locator) = self.locator() {
            locator.validate()?;
        }
        match self {
            Self::Navigate { url, .. } if url.trim().is_empty() => {
                Err(HarnessError::invalid("navigate: url is empty"))
            }
            Self::WaitForText { text, .. }
            | Self::AssertText { text, .. }
            | Self::AssertNotText { text, .. } => text.validate(),
            Self::Screenshot { path, .. } if path.as_os_str().is_empty() => {
                Err(HarnessError::invalid("screenshot: path is empty"))
            }
            Self::Evaluate { script, .. } if script.trim().is_empty() => {
                Err(HarnessError::invalid("evaluate: script is empty"))
            }
            Self::SetViewport {
                width,
                height,
                device_scale_factor,
            } => {
                if *width == 0 || *height == 0 {
                    return Err(HarnessError::invalid(format!(
                        "set_viewport: {width}x{height} has no area"
                    )));
                }
                match device_scale_factor {
                    Some(dsf) if !(dsf.is_finite() && *dsf > 0.0) => Err(HarnessError::invalid(
                        format!("set_viewport: device_scale_factor {dsf} must be positive"),
                    )),
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { url, .. } => write!(f, "navigate {url}"),
            Self::Reload { .. } => f.write_str("reload"),
            Self::Fill { locator, value, .. } => write!(f, "fill {locator} with {value:?}"),
            Self::WaitForText { locator, text, .. }
            | Self::AssertText { locator, text, .. }
            | Self::AssertNotText { locator, text, .. } => {
                write!(f, "{} {text} in {locator}", self.name())
            }
            Self::Screenshot { path, scope, .. } => match scope {
                ScreenshotScope::Element(locator) => {
                    write!(f, "screenshot {locator} to {}", path.display())
                }
                _ => write!(f, "screenshot to {}", path.display()),
            },
            Self::Evaluate { script, .. } => {
                let first = script.lines().next().unwrap_or_default();
                write!(f, "evaluate {first}")
            }
            Self::SetViewport { width, height, .. } => {
                write!(f, "set_viewport {width}x{height}")
            }
            Self::Click { locator, .. }
            | Self::WaitForVisible { locator, .. }
            | Self::AssertEnabled { locator, .. } => write!(f, "{} {locator}", self.name()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::FrameHop;

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_parse_click_in_frame() {
            let yaml = r#"
action: click
locator:
  frames: [{ url_contains: /iframe }]
  role: button
  name: Hacer un Reclamo
timeout_ms: 2000
"#;
            let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
            let expected = Step::click(
                LocatorSpec::role_named("button", "Hacer un Reclamo")
                    .in_frame(FrameHop::UrlContains("/iframe".into())),
            )
            .with_timeout(Duration::from_secs(2));
            assert_eq!(step, expected);
            assert_eq!(step.timeout(), Some(Duration::from_millis(2000)));
        }

        #[test]
        fn test_parse_navigate_defaults() {
            let step: Step = serde_yaml_ng::from_str("action: navigate\nurl: /").unwrap();
            assert_eq!(step, Step::navigate("/"));
            let step: Step =
                serde_yaml_ng::from_str("action: navigate\nurl: /\nwait_until: network_idle")
                    .unwrap();
            assert_eq!(step, Step::navigate("/").with_wait_until(LoadState::NetworkIdle));
        }

        #[test]
        fn test_parse_text_modes() {
            let yaml = "action: assert_not_text\nlocator: { css: body }\ntext: { exact: Usuario de WhatsApp }";
            let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(
                step,
                Step::assert_not_text(LocatorSpec::css("body"), TextMatch::exact("Usuario de WhatsApp"))
            );
        }

        #[test]
        fn test_parse_element_screenshot() {
            let yaml = "action: screenshot\npath: out/widget.png\nscope: { element: { css: '#chatboc-widget-container' } }";
            let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(
                step,
                Step::screenshot(
                    "out/widget.png",
                    ScreenshotScope::Element(LocatorSpec::css("#chatboc-widget-container"))
                )
            );
            let full: Step = serde_yaml_ng::from_str("action: screenshot\npath: a.png").unwrap();
            assert_eq!(full, Step::screenshot("a.png", ScreenshotScope::FullPage));
        }

        #[test]
        fn test_unknown_action_and_field_rejected() {
            assert!(serde_yaml_ng::from_str::<Step>("action: hover\nlocator: { css: a }").is_err());
            assert!(
                serde_yaml_ng::from_str::<Step>("action: reload\nselector: a").is_err(),
                "unknown field must be rejected"
            );
            assert!(serde_yaml_ng::from_str::<Step>("action: click").is_err());
        }
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn test_valid_steps() {
            for step in [
                Step::navigate("/"),
                Step::reload(),
                Step::fill(LocatorSpec::label("Email"), "a@b.c"),
                Step::evaluate("localStorage.clear()"),
                Step::set_viewport(375, 667),
            ] {
                assert!(step.validate().is_ok(), "{step}");
            }
        }

        #[test]
        fn test_invalid_steps() {
            for step in [
                Step::navigate("  "),
                Step::wait_for_text(LocatorSpec::css("body"), ""),
                Step::screenshot("", ScreenshotScope::Viewport),
                Step::evaluate(""),
                Step::set_viewport(0, 667),
                Step::SetViewport {
                    width: 375,
                    height: 667,
                    device_scale_factor: Some(0.0),
                },
                Step::click(LocatorSpec::css("")),
            ] {
                let err = step.validate().unwrap_err();
                assert!(matches!(err, HarnessError::InvalidScenario { .. }), "{step}: {err}");
            }
        }
    }

    mod describe_tests {
        use super::*;

        #[test]
        fn test_display() {
            assert_eq!(Step::reload().to_string(), "reload");
            assert_eq!(Step::set_viewport(375, 667).to_string(), "set_viewport 375x667");
            let click = Step::click(LocatorSpec::test_id("send"));
            assert!(click.to_string().starts_with("click "));
            assert_eq!(click.name(), "click");
        }

        #[test]
        fn test_timeout_only_where_supported() {
            let step = Step::evaluate("1").with_timeout(Duration::from_secs(1));
            assert_eq!(step.timeout(), None);
            assert!(Step::reload().with_wait_until(LoadState::None).timeout().is_none());
        }
    }
}
