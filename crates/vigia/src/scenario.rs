//! Scenarios: a named, ordered list of steps plus the session setup they need.

use crate::network::{MockRoute, RouteTable};
use crate::result::{HarnessError, HarnessResult};
use crate::session::{SessionConfig, Viewport};
use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

/// A UI verification scenario
///
/// Construct with [`Scenario::builder`] or load from YAML; both paths
/// validate every step before anything runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Scenario name, also used for the diagnostics directory
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Base URL for relative `navigate` targets (falls back to the runner's)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Query parameters added to relative navigations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    /// Viewport override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    /// Device scale factor override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_scale_factor: Option<f64>,
    /// Requests fulfilled with canned responses
    #[serde(default, skip_serializing_if = "RouteTable::is_empty")]
    pub routes: RouteTable,
    /// `localStorage` entries seeded on the target origin before page scripts run
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub local_storage: BTreeMap<String, serde_json::Value>,
    /// Scripts evaluated before page scripts on every navigation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_scripts: Vec<String>,
    /// Ordered steps
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Start building a scenario
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder::new(name)
    }

    /// Parse and validate a YAML scenario
    pub fn from_yaml_str(yaml: &str) -> HarnessResult<Self> {
        let scenario: Self = serde_yaml_ng::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load and validate a YAML scenario file
    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml).map_err(|e| match e {
            HarnessError::Yaml(inner) => {
                HarnessError::invalid(format!("{}: {inner}", path.display()))
            }
            HarnessError::InvalidScenario { message } => {
                HarnessError::invalid(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Check the scenario can run
    pub fn validate(&self) -> HarnessResult<()> {
        if self.name.trim().is_empty() {
            return Err(HarnessError::invalid("scenario name is empty"));
        }
        if self.steps.is_empty() {
            return Err(HarnessError::invalid(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }
        if let Some(base) = &self.base_url {
            Url::parse(base)
                .map_err(|e| HarnessError::invalid(format!("bad base_url '{base}': {e}")))?;
        }
        if let Some(viewport) = self.viewport {
            if viewport.width == 0 || viewport.height == 0 {
                return Err(HarnessError::invalid("viewport has no area"));
            }
        }
        if let Some(dsf) = self.device_scale_factor {
            if !(dsf.is_finite() && dsf > 0.0) {
                return Err(HarnessError::invalid(format!(
                    "device_scale_factor {dsf} must be positive"
                )));
            }
        }
        self.routes.validate()?;
        for (i, step) in self.steps.iter().enumerate() {
            step.validate().map_err(|e| {
                HarnessError::invalid(format!("step {} ({}): {}", i + 1, step.name(), detail(&e)))
            })?;
        }
        Ok(())
    }

    /// File-system friendly form of the name
    ///
    /// Letters outside ASCII are kept (lowercased); everything else
    /// collapses to single dashes.
    #[must_use]
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        for c in self.name.chars() {
            if c.is_alphanumeric() {
                slug.extend(c.to_lowercase());
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            "scenario".to_string()
        } else {
            slug.to_string()
        }
    }

    /// Session configuration with this scenario's overrides applied
    #[must_use]
    pub fn session_config(&self, base: &SessionConfig) -> SessionConfig {
        let mut config = base.clone();
        if let Some(viewport) = self.viewport {
            config.viewport = viewport;
        }
        if let Some(dsf) = self.device_scale_factor {
            config.device_scale_factor = dsf;
        }
        config
    }

    /// Effective base URL: the scenario's own, else `fallback`
    #[must_use]
    pub fn effective_base<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        self.base_url.as_deref().or(fallback)
    }

    /// Resolve a `navigate` target
    ///
    /// Absolute URLs are used unchanged. Relative ones are joined to the
    /// base and receive every query parameter they do not already carry.
    pub fn resolve_url(&self, target: &str, fallback_base: Option<&str>) -> HarnessResult<String> {
        if let Ok(absolute) = Url::parse(target) {
            return Ok(absolute.to_string());
        }
        let base = self.effective_base(fallback_base).ok_or_else(|| {
            HarnessError::invalid(format!("relative URL '{target}' needs a base_url"))
        })?;
        let base = Url::parse(base)
            .map_err(|e| HarnessError::invalid(format!("bad base_url '{base}': {e}")))?;
        let mut url = base
            .join(target)
            .map_err(|e| HarnessError::invalid(format!("cannot join '{target}' to {base}: {e}")))?;

        let present: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        let missing: Vec<(&String, &String)> = self
            .query
            .iter()
            .filter(|(k, _)| !present.iter().any(|p| p == *k))
            .collect();
        if !missing.is_empty() {
            url.query_pairs_mut().extend_pairs(missing);
        }
        Ok(url.to_string())
    }

    /// Script seeding `local_storage` on the base URL's origin
    pub fn seed_script(&self, fallback_base: Option<&str>) -> HarnessResult<Option<String>> {
        if self.local_storage.is_empty() {
            return Ok(None);
        }
        let origin = match self.effective_base(fallback_base) {
            Some(base) => {
                let url = Url::parse(base)
                    .map_err(|e| HarnessError::invalid(format!("bad base_url '{base}': {e}")))?;
                Some(url.origin().ascii_serialization())
            }
            None => None,
        };
        let entries = serde_json::to_string(&self.local_storage)?;
        let origin = serde_json::to_string(&origin)?;
        Ok(Some(format!(
            "(() => {{ const origin = {origin}; if (origin !== null && location.origin !== origin) return; \
             const entries = {entries}; \
             try {{ for (const [k, v] of Object.entries(entries)) localStorage.setItem(k, typeof v === 'string' ? v : JSON.stringify(v)); }} catch (_) {{}} }})();"
        )))
    }
}

fn detail(e: &HarnessError) -> String {
    match e {
        HarnessError::InvalidScenario { message } => message.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builder for [`Scenario`]
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            scenario: Scenario {
                name: name.into(),
                description: None,
                base_url: None,
                query: BTreeMap::new(),
                viewport: None,
                device_scale_factor: None,
                routes: RouteTable::new(),
                local_storage: BTreeMap::new(),
                init_scripts: Vec::new(),
                steps: Vec::new(),
            },
        }
    }

    /// Set description
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.scenario.description = Some(text.into());
        self
    }

    /// Set base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.scenario.base_url = Some(url.into());
        self
    }

    /// Add a query parameter for relative navigations
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.scenario.query.insert(key.into(), value.into());
        self
    }

    /// Override the viewport
    #[must_use]
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.scenario.viewport = Some(Viewport::new(width, height));
        self
    }

    /// Override the device scale factor
    #[must_use]
    pub fn device_scale_factor(mut self, factor: f64) -> Self {
        self.scenario.device_scale_factor = Some(factor);
        self
    }

    /// Add a mock route
    #[must_use]
    pub fn route(mut self, route: MockRoute) -> Self {
        self.scenario.routes = self.scenario.routes.with_route(route);
        self
    }

    /// Seed a `localStorage` entry
    #[must_use]
    pub fn local_storage(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.scenario.local_storage.insert(key.into(), value);
        self
    }

    /// Add an init script
    #[must_use]
    pub fn init_script(mut self, script: impl Into<String>) -> Self {
        self.scenario.init_scripts.push(script.into());
        self
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.scenario.steps.push(step);
        self
    }

    /// Append several steps
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.scenario.steps.extend(steps);
        self
    }

    /// Validate and finish
    pub fn build(self) -> HarnessResult<Scenario> {
        self.scenario.validate()?;
        Ok(self.scenario)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::LocatorSpec;
    use crate::network::MockResponse;

    const WIDGET_YAML: &str = r#"
name: Widget reclamo flow
base_url: http://localhost:5173
query: { widget: "1", lang: es }
viewport: { width: 375, height: 667 }
routes:
  - pattern: { glob: "**/api/me" }
    method: GET
    response: { status: 401, body: '{"error":"unauthorized"}' }
local_storage:
  authToken: abc
  user: { name: Ana, rol: admin }
steps:
  - action: navigate
    url: /
  - action: click
    locator:
      frames: [{ url_contains: /iframe }]
      role: button
      name: Hacer un Reclamo
  - action: wait_for_text
    locator: { frames: [{ url_contains: /iframe }], css: body }
    text: Tipos de Reclamo
    timeout_ms: 2000
"#;

    mod load_tests {
        use super::*;

        #[test]
        fn test_from_yaml() {
            let scenario = Scenario::from_yaml_str(WIDGET_YAML).unwrap();
            assert_eq!(scenario.steps.len(), 3);
            assert_eq!(scenario.routes.len(), 1);
            assert_eq!(scenario.viewport, Some(Viewport::new(375, 667)));
            assert_eq!(scenario.slug(), "widget-reclamo-flow");
        }

        #[test]
        fn test_slug_keeps_accented_letters() {
            let slug = |name: &str| {
                Scenario::builder(name)
                    .step(Step::navigate("http://app/"))
                    .build()
                    .unwrap()
                    .slug()
            };
            assert_eq!(slug("Reclamo válido"), "reclamo-válido");
            assert_ne!(slug("Reclamo válido"), slug("Reclamo vílido"));
            assert_eq!(slug("¿Año?"), "año");
            assert_eq!(slug("***"), "scenario");
        }

        #[test]
        fn test_invalid_step_reports_position() {
            let yaml = "name: x\nsteps:\n  - action: navigate\n    url: /\n  - action: evaluate\n    script: ''\n";
            let err = Scenario::from_yaml_str(yaml).unwrap_err();
            assert!(err.to_string().contains("step 2 (evaluate)"), "{err}");
        }

        #[test]
        fn test_rejects_unknown_fields_and_empty() {
            assert!(Scenario::from_yaml_str("name: x\nstep: []").is_err());
            assert!(Scenario::from_yaml_str("name: x\nsteps: []").is_err());
        }

        #[test]
        fn test_load_file_prefixes_path() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("bad.yaml");
            std::fs::write(&path, "name: x\nsteps: []\n").unwrap();
            let err = Scenario::load(&path).unwrap_err();
            assert!(err.to_string().contains("bad.yaml"), "{err}");
            assert!(Scenario::load(dir.path().join("missing.yaml")).is_err());
        }
    }

    mod url_tests {
        use super::*;

        fn scenario() -> Scenario {
            Scenario::builder("urls")
                .base_url("http://localhost:5173/app/")
                .query("widget", "1")
                .step(Step::navigate("/"))
                .build()
                .unwrap()
        }

        #[test]
        fn test_relative_gets_base_and_query() {
            assert_eq!(
                scenario().resolve_url("iframe", None).unwrap(),
                "http://localhost:5173/app/iframe?widget=1"
            );
        }

        #[test]
        fn test_existing_query_param_wins() {
            assert_eq!(
                scenario().resolve_url("/iframe?widget=0", None).unwrap(),
                "http://localhost:5173/iframe?widget=0"
            );
        }

        #[test]
        fn test_absolute_untouched() {
            assert_eq!(
                scenario().resolve_url("https://example.com/x", None).unwrap(),
                "https://example.com/x"
            );
        }

        #[test]
        fn test_fallback_base() {
            let scenario = Scenario::builder("no base")
                .step(Step::navigate("/"))
                .build()
                .unwrap();
            assert!(scenario.resolve_url("/", None).is_err());
            assert_eq!(
                scenario.resolve_url("/login", Some("http://127.0.0.1:8080")).unwrap(),
                "http://127.0.0.1:8080/login"
            );
        }
    }

    mod seed_tests {
        use super::*;

        #[test]
        fn test_seed_script_checks_origin() {
            let scenario = Scenario::builder("seed")
                .base_url("http://localhost:5173/admin")
                .local_storage("authToken", serde_json::json!("abc"))
                .step(Step::navigate("/"))
                .build()
                .unwrap();
            let script = scenario.seed_script(None).unwrap().unwrap();
            assert!(script.contains("\"http://localhost:5173\""));
            assert!(script.contains("\"authToken\":\"abc\""));
        }

        #[test]
        fn test_no_seed_without_entries() {
            let scenario = Scenario::builder("plain")
                .step(Step::navigate("http://x/"))
                .build()
                .unwrap();
            assert!(scenario.seed_script(None).unwrap().is_none());
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn test_build_validates() {
            assert!(Scenario::builder("empty").build().is_err());
            assert!(Scenario::builder("bad base")
                .base_url("not a url")
                .step(Step::reload())
                .build()
                .is_err());
            let ok = Scenario::builder("ok")
                .route(MockRoute::glob("**/api/**/cart", MockResponse::text("[]")))
                .step(Step::click(LocatorSpec::test_id("buy")))
                .build()
                .unwrap();
            assert_eq!(ok.routes.len(), 1);
        }

        #[test]
        fn test_session_overrides() {
            let scenario = Scenario::builder("mobile")
                .viewport(375, 667)
                .device_scale_factor(2.0)
                .step(Step::reload())
                .build()
                .unwrap();
            let config = scenario.session_config(&SessionConfig::default());
            assert_eq!(config.viewport, Viewport::new(375, 667));
            assert_eq!(config.device_scale_factor, 2.0);
        }
    }
}
