//! Session lifecycle: one browser plus one page per scenario.
//!
//! [`SessionManager::with_session`] is the scoped form used by the runner:
//! the session is released exactly once whether the body returns or panics.

use crate::driver::{Driver, Launcher};
use crate::network::RouteTable;
use crate::result::{HarnessError, HarnessResult};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default navigation timeout
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Viewport {
    /// Create a viewport
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 800)
    }
}

/// Browser session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Initial viewport
    pub viewport: Viewport,
    /// Device scale factor
    pub device_scale_factor: f64,
    /// Forward browser console output to the log and keep it for diagnostics
    pub console_logging: bool,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// User agent string
    pub user_agent: Option<String>,
    /// Bound on each navigation wait
    pub navigation_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            device_scale_factor: 1.0,
            console_logging: false,
            chromium_path: None,
            sandbox: true,
            user_agent: None,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }
}

impl SessionConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    /// Set device scale factor
    #[must_use]
    pub const fn with_device_scale_factor(mut self, factor: f64) -> Self {
        self.device_scale_factor = factor;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Enable console capture
    #[must_use]
    pub const fn with_console_logging(mut self, enabled: bool) -> Self {
        self.console_logging = enabled;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Navigation timeout
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// A live browser session
///
/// Consumed by [`Session::release`]; dropping an unreleased session logs a
/// warning because the browser process may outlive it.
#[derive(Debug)]
pub struct Session<D: Driver> {
    driver: D,
    config: SessionConfig,
    released: bool,
}

impl<D: Driver> Session<D> {
    /// Wrap an already launched driver
    #[must_use]
    pub const fn new(driver: D, config: SessionConfig) -> Self {
        Self {
            driver,
            config,
            released: false,
        }
    }

    /// The page driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Configuration the session was launched with
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Close the page and the browser
    pub async fn release(mut self) -> HarnessResult<()> {
        self.released = true;
        debug!("releasing browser session");
        self.driver.close().await
    }
}

impl<D: Driver> Drop for Session<D> {
    fn drop(&mut self) {
        if !self.released {
            warn!("browser session dropped without release");
        }
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Creates and tears down sessions through a [`Launcher`]
#[derive(Debug, Clone)]
pub struct SessionManager<L: Launcher> {
    launcher: L,
}

impl<L: Launcher> SessionManager<L> {
    /// Create a manager
    #[must_use]
    pub const fn new(launcher: L) -> Self {
        Self { launcher }
    }

    /// The launcher in use
    #[must_use]
    pub const fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Launch a browser with `routes` installed
    ///
    /// Every launch failure is reported as an environment error; it is never
    /// retried.
    pub async fn acquire(
        &self,
        config: &SessionConfig,
        routes: &RouteTable,
    ) -> HarnessResult<Session<L::Driver>> {
        routes.validate()?;
        let driver = self
            .launcher
            .launch(config, routes)
            .await
            .map_err(|e| match e {
                HarnessError::Environment { .. } => e,
                other => HarnessError::environment(format!("browser launch failed: {other}")),
            })?;
        info!(
            headless = config.headless,
            width = config.viewport.width,
            height = config.viewport.height,
            routes = routes.len(),
            "browser session acquired"
        );
        Ok(Session::new(driver, config.clone()))
    }

    /// Run `body` against a fresh session, releasing it on every exit path
    ///
    /// A panic inside `body` is re-raised after the session is released.
    pub async fn with_session<T, F>(
        &self,
        config: &SessionConfig,
        routes: &RouteTable,
        body: F,
    ) -> HarnessResult<T>
    where
        F: for<'s> FnOnce(&'s Session<L::Driver>) -> BoxFuture<'s, T>,
    {
        let session = self.acquire(config, routes).await?;
        let outcome = AssertUnwindSafe(body(&session)).catch_unwind().await;
        if let Err(e) = session.release().await {
            warn!(error = %e, "browser session did not close cleanly");
        }
        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{MockDocument, MockLauncher, MockSite};
    use crate::network::{MockResponse, MockRoute, UrlPattern};

    fn launcher() -> MockLauncher {
        MockLauncher::new(MockSite::new().page(UrlPattern::Any, MockDocument::new("http://app/")))
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = SessionConfig::default();
            assert!(config.headless);
            assert_eq!(config.viewport, Viewport::new(1280, 800));
            assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
        }

        #[test]
        fn test_builders() {
            let config = SessionConfig::default()
                .with_viewport(375, 667)
                .with_device_scale_factor(2.0)
                .with_headless(false)
                .with_no_sandbox()
                .with_console_logging(true);
            assert_eq!(config.viewport.width, 375);
            assert_eq!(config.device_scale_factor, 2.0);
            assert!(!config.headless && !config.sandbox && config.console_logging);
        }

        #[test]
        fn test_yaml_partial() {
            let config: SessionConfig =
                serde_yaml_ng::from_str("viewport: { width: 375, height: 667 }\nconsole_logging: true")
                    .unwrap();
            assert_eq!(config.viewport, Viewport::new(375, 667));
            assert!(config.console_logging);
            assert!(config.headless);
            assert!(serde_yaml_ng::from_str::<SessionConfig>("headles: true").is_err());
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[tokio::test]
        async fn test_with_session_releases_once() {
            let manager = SessionManager::new(launcher());
            let stats = manager.launcher().stats();
            let value = manager
                .with_session(&SessionConfig::default(), &RouteTable::new(), |session| {
                    async move {
                        session.driver().navigate("http://app/").await.unwrap();
                        7
                    }
                    .boxed()
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
            assert_eq!(stats.launched(), 1);
            assert_eq!(stats.closed(), 1);
        }

        #[tokio::test]
        async fn test_with_session_releases_on_panic() {
            let manager = SessionManager::new(launcher());
            let stats = manager.launcher().stats();
            let result = AssertUnwindSafe(manager.with_session(
                &SessionConfig::default(),
                &RouteTable::new(),
                |_session| async move { panic!("step blew up") }.boxed(),
            ))
            .catch_unwind()
            .await;
            assert!(result.is_err());
            assert_eq!(stats.closed(), 1);
        }

        #[tokio::test]
        async fn test_launch_failure_is_environment_error() {
            let manager = SessionManager::new(launcher().failing("chromium not found"));
            let stats = manager.launcher().stats();
            let err = manager
                .with_session(&SessionConfig::default(), &RouteTable::new(), |_| {
                    async move {}.boxed()
                })
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::Environment { .. }));
            assert_eq!(stats.launched(), 0);
            assert_eq!(stats.closed(), 0);
        }

        #[tokio::test]
        async fn test_routes_reach_driver() {
            let manager = SessionManager::new(launcher());
            let routes = RouteTable::new().with_route(MockRoute::glob("**/api/me", MockResponse::error(401, "no")));
            let session = manager.acquire(&SessionConfig::default(), &routes).await.unwrap();
            assert_eq!(session.driver().routes().len(), 1);
            session.release().await.unwrap();
        }

        #[tokio::test]
        async fn test_invalid_route_rejected_before_launch() {
            let manager = SessionManager::new(launcher());
            let stats = manager.launcher().stats();
            let routes = RouteTable::new().with_route(MockRoute::new(
                UrlPattern::Regex("(".into()),
                MockResponse::new(),
            ));
            assert!(manager.acquire(&SessionConfig::default(), &routes).await.is_err());
            assert_eq!(stats.launched(), 0);
        }
    }
}
