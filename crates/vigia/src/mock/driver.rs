//! Driver and launcher over the in-memory DOM.

use super::dom::{self, DomState, MockSite};
use crate::driver::{CaptureScope, ConsoleMessage, ConsoleSink, Driver, Launcher};
use crate::locator::{LocatorSpec, NodePath, Probe};
use crate::network::RouteTable;
use crate::result::{HarnessError, HarnessResult};
use crate::session::SessionConfig;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;

/// PNG signature; mock screenshots start with it so writers can sniff them
pub const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Scripted behavior shared by every driver a launcher produces
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    script_results: BTreeMap<String, serde_json::Value>,
    failing_scripts: BTreeMap<String, String>,
    panicking_scripts: Vec<String>,
    fail_screenshots: bool,
    console_on_load: Vec<ConsoleMessage>,
    resource_count: usize,
}

impl MockBehavior {
    /// Default behavior: every script evaluates to `null`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `evaluate(script)` returns `value`
    #[must_use]
    pub fn script_result(mut self, script: &str, value: serde_json::Value) -> Self {
        self.script_results.insert(script.to_string(), value);
        self
    }

    /// `evaluate(script)` fails with a script error
    #[must_use]
    pub fn script_error(mut self, script: &str, message: &str) -> Self {
        self.failing_scripts
            .insert(script.to_string(), message.to_string());
        self
    }

    /// `evaluate(script)` panics
    #[must_use]
    pub fn script_panics(mut self, script: &str) -> Self {
        self.panicking_scripts.push(script.to_string());
        self
    }

    /// Every screenshot capture fails
    #[must_use]
    pub const fn fail_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    /// Emit a console message after each navigation
    #[must_use]
    pub fn console_on_load(mut self, message: ConsoleMessage) -> Self {
        self.console_on_load.push(message);
        self
    }

    /// Fixed resource-timing count
    #[must_use]
    pub const fn resource_count(mut self, count: usize) -> Self {
        self.resource_count = count;
        self
    }
}

/// Launch and close counters, shared between a launcher and its drivers
#[derive(Debug, Default)]
pub struct LaunchStats {
    launched: AtomicUsize,
    closed: AtomicUsize,
}

impl LaunchStats {
    /// Sessions launched
    #[must_use]
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    /// Sessions closed
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct PageState {
    url: String,
    loaded_at: Instant,
    revealed: HashSet<String>,
    values: HashMap<NodePath, String>,
    closed: bool,
}

/// Mock driver for tests
///
/// Timing follows the tokio clock: a node with `mounts_after(d)` appears `d`
/// after the last navigation, so paused-time tests are deterministic.
#[derive(Debug)]
pub struct MockDriver {
    site: Arc<MockSite>,
    behavior: MockBehavior,
    config: SessionConfig,
    routes: RouteTable,
    stats: Arc<LaunchStats>,
    state: Mutex<PageState>,
    console: ConsoleSink,
    call_history: Mutex<Vec<String>>,
}

impl MockDriver {
    /// Driver over `site` with default behavior
    #[must_use]
    pub fn new(site: MockSite) -> Self {
        Self::with_parts(
            Arc::new(site),
            MockBehavior::default(),
            SessionConfig::default(),
            RouteTable::default(),
            Arc::new(LaunchStats::default()),
        )
    }

    fn with_parts(
        site: Arc<MockSite>,
        behavior: MockBehavior,
        config: SessionConfig,
        routes: RouteTable,
        stats: Arc<LaunchStats>,
    ) -> Self {
        let console = ConsoleSink::new(config.console_logging);
        Self {
            site,
            behavior,
            config,
            routes,
            stats,
            state: Mutex::new(PageState {
                url: "about:blank".to_string(),
                loaded_at: Instant::now(),
                revealed: HashSet::new(),
                values: HashMap::new(),
                closed: false,
            }),
            console,
            call_history: Mutex::new(Vec::new()),
        }
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.call_history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.history().iter().any(|c| c.starts_with(method))
    }

    /// Session configuration the driver was launched with
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Routes installed at launch
    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Value last filled into the node at `path`
    #[must_use]
    pub fn value_at(&self, path: &NodePath) -> Option<String> {
        self.state().ok()?.values.get(path).cloned()
    }

    fn record(&self, call: String) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(call);
        }
    }

    fn state(&self) -> HarnessResult<MutexGuard<'_, PageState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| HarnessError::protocol("mock page state poisoned"))?;
        if state.closed {
            return Err(HarnessError::protocol("page is closed"));
        }
        Ok(state)
    }

    fn load(&self, url: &str) -> HarnessResult<()> {
        if self.site.lookup(url).is_none() {
            return Err(HarnessError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        {
            let mut state = self.state()?;
            state.url = url.to_string();
            state.loaded_at = Instant::now();
            state.revealed.clear();
            state.values.clear();
        }
        for message in &self.behavior.console_on_load {
            self.console.record(message.clone());
        }
        Ok(())
    }

    fn with_dom<T>(
        &self,
        f: impl FnOnce(&dom::MockDocument, DomState<'_>) -> HarnessResult<T>,
    ) -> HarnessResult<T> {
        let state = self.state()?;
        let document = self
            .site
            .lookup(&state.url)
            .ok_or_else(|| HarnessError::protocol(format!("no document loaded at {}", state.url)))?;
        f(
            document,
            DomState {
                since_load: state.loaded_at.elapsed(),
                revealed: &state.revealed,
                values: &state.values,
            },
        )
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        self.record(format!("navigate:{url}"));
        self.load(url)
    }

    async fn reload(&self) -> HarnessResult<()> {
        self.record("reload".to_string());
        let url = self.state()?.url.clone();
        self.load(&url)
    }

    async fn start_navigation(&self, url: &str) -> HarnessResult<()> {
        self.record(format!("start_navigation:{url}"));
        self.load(url)
    }

    async fn start_reload(&self) -> HarnessResult<()> {
        self.record("start_reload".to_string());
        let url = self.state()?.url.clone();
        self.load(&url)
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.state()?.url.clone())
    }

    async fn ready_state(&self) -> HarnessResult<String> {
        self.record("ready_state".to_string());
        self.state()?;
        Ok("complete".to_string())
    }

    async fn resource_count(&self) -> HarnessResult<usize> {
        Ok(self.behavior.resource_count)
    }

    async fn probe(&self, spec: &LocatorSpec) -> HarnessResult<Probe> {
        self.with_dom(|document, state| dom::probe(document, spec, state))
    }

    async fn click(&self, path: &NodePath) -> HarnessResult<()> {
        self.record(format!("click:{path}"));
        let reveals = self.with_dom(|document, state| {
            dom::node_at(document, path, state)
                .map(|node| node.revealed_ids().to_vec())
                .ok_or_else(|| HarnessError::action(path.to_string(), "element is detached"))
        })?;
        self.state()?.revealed.extend(reveals);
        Ok(())
    }

    async fn fill(&self, path: &NodePath, value: &str) -> HarnessResult<()> {
        self.record(format!("fill:{path}={value}"));
        self.with_dom(|document, state| {
            dom::node_at(document, path, state)
                .map(|_| ())
                .ok_or_else(|| HarnessError::action(path.to_string(), "element is detached"))
        })?;
        self.state()?.values.insert(path.clone(), value.to_string());
        Ok(())
    }

    #[allow(clippy::panic)]
    async fn evaluate(&self, script: &str) -> HarnessResult<serde_json::Value> {
        self.record(format!("evaluate:{script}"));
        self.state()?;
        if self.behavior.panicking_scripts.iter().any(|s| s == script) {
            panic!("mock script panicked: {script}");
        }
        if let Some(message) = self.behavior.failing_scripts.get(script) {
            return Err(HarnessError::script(message.clone()));
        }
        Ok(self
            .behavior
            .script_results
            .get(script)
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn add_init_script(&self, script: &str) -> HarnessResult<()> {
        self.record(format!("init_script:{}", script.len()));
        Ok(())
    }

    async fn set_viewport(
        &self,
        width: u32,
        height: u32,
        device_scale_factor: f64,
    ) -> HarnessResult<()> {
        self.record(format!("viewport:{width}x{height}@{device_scale_factor}"));
        Ok(())
    }

    async fn screenshot(&self, scope: CaptureScope) -> HarnessResult<Vec<u8>> {
        self.record(format!("screenshot:{scope:?}"));
        self.state()?;
        if self.behavior.fail_screenshots {
            return Err(HarnessError::screenshot("capture failed (mock)"));
        }
        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(format!("{scope:?}").as_bytes());
        Ok(png)
    }

    fn console_messages(&self) -> Vec<ConsoleMessage> {
        self.console.messages()
    }

    async fn close(&self) -> HarnessResult<()> {
        self.record("close".to_string());
        let mut state = self
            .state
            .lock()
            .map_err(|_| HarnessError::protocol("mock page state poisoned"))?;
        if state.closed {
            return Err(HarnessError::protocol("browser already closed"));
        }
        state.closed = true;
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launches [`MockDriver`]s over one shared site
#[derive(Debug, Clone)]
pub struct MockLauncher {
    site: Arc<MockSite>,
    behavior: MockBehavior,
    stats: Arc<LaunchStats>,
    /// Successful launches allowed before every launch fails with the message
    launch_error: Option<(usize, String)>,
}

impl MockLauncher {
    /// Launcher serving `site`
    #[must_use]
    pub fn new(site: MockSite) -> Self {
        Self {
            site: Arc::new(site),
            behavior: MockBehavior::default(),
            stats: Arc::new(LaunchStats::default()),
            launch_error: None,
        }
    }

    /// Scripted behavior for every driver
    #[must_use]
    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Make every launch fail, as if the browser binary were missing
    #[must_use]
    pub fn failing(self, message: &str) -> Self {
        self.failing_after(0, message)
    }

    /// Let `launches` sessions start, then fail every later launch
    #[must_use]
    pub fn failing_after(mut self, launches: usize, message: &str) -> Self {
        self.launch_error = Some((launches, message.to_string()));
        self
    }

    /// Shared launch/close counters
    #[must_use]
    pub fn stats(&self) -> Arc<LaunchStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    type Driver = MockDriver;

    async fn launch(&self, config: &SessionConfig, routes: &RouteTable) -> HarnessResult<MockDriver> {
        let launched = self.stats.launched.fetch_add(1, Ordering::SeqCst);
        if let Some((allowed, message)) = &self.launch_error {
            if launched >= *allowed {
                self.stats.launched.fetch_sub(1, Ordering::SeqCst);
                return Err(HarnessError::environment(message.clone()));
            }
        }
        Ok(MockDriver::with_parts(
            Arc::clone(&self.site),
            self.behavior.clone(),
            config.clone(),
            routes.clone(),
            self.stats(),
        ))
    }
}
