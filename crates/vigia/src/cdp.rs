//! Chromium driver over the DevTools protocol (chromiumoxide).
//!
//! One browser process per session. Locators are evaluated by an in-page
//! probe program (see `locator::script`); clicks and typing go through CDP
//! input events so the page sees trusted events.

use crate::driver::{CaptureScope, ConsoleLevel, ConsoleMessage, ConsoleSink, Driver, Launcher};
use crate::locator::script::{
    center_expression, focus_clear_expression, probe_expression, READY_STATE_EXPRESSION,
    RESOURCE_COUNT_EXPRESSION,
};
use crate::locator::{LocatorSpec, NodePath, Probe};
use crate::network::RouteTable;
use crate::result::{HarnessError, HarnessResult};
use crate::session::SessionConfig;
use async_trait::async_trait;
use base64::Engine as _;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FulfillRequestParams, HeaderEntry, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, CaptureScreenshotParams,
    NavigateParams, ReloadParams, Viewport as ClipRect,
};
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::Deserialize;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Environment variable naming the Chromium binary
pub const CHROMIUM_PATH_ENV: &str = "CHROMIUM_PATH";

fn protocol(e: impl Display) -> HarnessError {
    HarnessError::protocol(e.to_string())
}

fn script(e: impl Display) -> HarnessError {
    HarnessError::script(e.to_string())
}

/// Launches one Chromium process per session
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    /// Create a launcher
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Launcher for ChromiumLauncher {
    type Driver = ChromiumDriver;

    async fn launch(
        &self,
        config: &SessionConfig,
        routes: &RouteTable,
    ) -> HarnessResult<ChromiumDriver> {
        ChromiumDriver::launch(config, routes).await
    }
}

/// Live Chromium page
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<CdpBrowser>,
    page: CdpPage,
    console: Arc<ConsoleSink>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct PageMetrics {
    width: f64,
    height: f64,
    inner_width: f64,
    inner_height: f64,
    scroll_x: f64,
    scroll_y: f64,
}

const METRICS_EXPRESSION: &str = "({ width: Math.max(document.documentElement.scrollWidth, innerWidth), \
     height: Math.max(document.documentElement.scrollHeight, innerHeight), \
     inner_width: innerWidth, inner_height: innerHeight, scroll_x: scrollX, scroll_y: scrollY })";

impl ChromiumDriver {
    /// Start Chromium, open a blank page and install `routes`
    pub async fn launch(config: &SessionConfig, routes: &RouteTable) -> HarnessResult<Self> {
        let mut builder = CdpConfig::builder().window_size(config.viewport.width, config.viewport.height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        let executable = config
            .chromium_path
            .clone()
            .or_else(|| std::env::var(CHROMIUM_PATH_ENV).ok());
        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(HarnessError::environment)?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| HarnessError::environment(e.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarnessError::environment(e.to_string()))?;
        info!(
            headless = config.headless,
            width = config.viewport.width,
            height = config.viewport.height,
            "chromium launched"
        );

        let driver = Self {
            browser: Mutex::new(browser),
            page,
            console: Arc::new(ConsoleSink::new(config.console_logging)),
            tasks: StdMutex::new(vec![handler_task]),
            closed: AtomicBool::new(false),
        };

        driver
            .set_viewport(
                config.viewport.width,
                config.viewport.height,
                config.device_scale_factor,
            )
            .await?;
        if let Some(ua) = &config.user_agent {
            driver
                .page
                .execute(SetUserAgentOverrideParams::new(ua.clone()))
                .await
                .map_err(protocol)?;
        }
        if config.console_logging {
            driver.capture_console().await?;
        }
        if !routes.is_empty() {
            driver.intercept(routes.clone()).await?;
        }
        Ok(driver)
    }

    fn track(&self, task: JoinHandle<()>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(task);
        }
    }

    async fn capture_console(&self) -> HarnessResult<()> {
        let mut calls = self
            .page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(protocol)?;
        let sink = Arc::clone(&self.console);
        self.track(tokio::spawn(async move {
            while let Some(call) = calls.next().await {
                let text = call
                    .args
                    .iter()
                    .map(|arg| match (&arg.value, &arg.description) {
                        (Some(serde_json::Value::String(s)), _) => s.clone(),
                        (Some(value), _) => value.to_string(),
                        (None, Some(description)) => description.clone(),
                        (None, None) => String::new(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                let kind = serde_json::to_value(&call.r#type)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                sink.record(ConsoleMessage::new(ConsoleLevel::from_cdp(&kind), text));
            }
        }));

        let mut exceptions = self
            .page
            .event_listener::<EventExceptionThrown>()
            .await
            .map_err(protocol)?;
        let sink = Arc::clone(&self.console);
        self.track(tokio::spawn(async move {
            while let Some(thrown) = exceptions.next().await {
                let details = &thrown.exception_details;
                let text = details
                    .exception
                    .as_ref()
                    .and_then(|e| e.description.clone())
                    .unwrap_or_else(|| details.text.clone());
                sink.record(ConsoleMessage::new(ConsoleLevel::Error, text));
            }
        }));
        Ok(())
    }

    async fn intercept(&self, routes: RouteTable) -> HarnessResult<()> {
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(protocol)?;
        self.page
            .execute(
                FetchEnableParams::builder()
                    .patterns(vec![RequestPattern::builder().url_pattern("*").build()])
                    .build(),
            )
            .await
            .map_err(protocol)?;

        let page = self.page.clone();
        self.track(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let url = &event.request.url;
                let outcome = match routes.lookup(url, &event.request.method) {
                    Some(route) => {
                        debug!(url = %url, pattern = ?route.pattern, "fulfilling intercepted request");
                        let response = &route.response;
                        let headers: Vec<HeaderEntry> = response
                            .header_pairs()
                            .into_iter()
                            .map(|(name, value)| HeaderEntry::new(name, value))
                            .collect();
                        let body = base64::engine::general_purpose::STANDARD.encode(&response.body);
                        match FulfillRequestParams::builder()
                            .request_id(event.request_id.clone())
                            .response_code(i64::from(response.status))
                            .response_headers(headers)
                            .body(body)
                            .build()
                        {
                            Ok(params) => page.execute(params).await.map(|_| ()),
                            Err(e) => {
                                warn!(url = %url, error = %e, "bad fulfill params");
                                page.execute(ContinueRequestParams::new(event.request_id.clone()))
                                    .await
                                    .map(|_| ())
                            }
                        }
                    }
                    None => page
                        .execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ()),
                };
                if let Err(e) = outcome {
                    debug!(url = %url, error = %e, "intercepted request not answered");
                }
            }
        }));
        Ok(())
    }

    async fn eval_value(&self, expression: String) -> HarnessResult<serde_json::Value> {
        let result = self.page.evaluate(expression).await.map_err(script)?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn metrics(&self) -> HarnessResult<PageMetrics> {
        let value = self.eval_value(METRICS_EXPRESSION.to_string()).await?;
        serde_json::from_value(value).map_err(|e| HarnessError::screenshot(e.to_string()))
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> HarnessResult<()> {
        let mut builder = DispatchMouseEventParams::builder().r#type(kind.clone()).x(x).y(y);
        if kind != DispatchMouseEventType::MouseMoved {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder.build().map_err(protocol)?;
        self.page.execute(params).await.map_err(protocol)?;
        Ok(())
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        debug!(url, "navigating");
        self.page
            .goto(url)
            .await
            .map_err(|e| HarnessError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn reload(&self) -> HarnessResult<()> {
        let url = self.current_url().await.unwrap_or_default();
        self.page
            .reload()
            .await
            .map_err(|e| HarnessError::Navigation {
                url,
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn start_navigation(&self, url: &str) -> HarnessResult<()> {
        debug!(url, "navigating without waiting");
        let navigation_error = |message: String| HarnessError::Navigation {
            url: url.to_string(),
            message,
        };
        let response = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| navigation_error(e.to_string()))?;
        match &response.result.error_text {
            Some(text) => Err(navigation_error(text.clone())),
            None => Ok(()),
        }
    }

    async fn start_reload(&self) -> HarnessResult<()> {
        self.page
            .execute(ReloadParams::default())
            .await
            .map_err(protocol)?;
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.page.url().await.map_err(protocol)?.unwrap_or_default())
    }

    async fn ready_state(&self) -> HarnessResult<String> {
        let value = self.eval_value(READY_STATE_EXPRESSION.to_string()).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn resource_count(&self) -> HarnessResult<usize> {
        let value = self.eval_value(RESOURCE_COUNT_EXPRESSION.to_string()).await?;
        Ok(value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default())
    }

    async fn probe(&self, spec: &LocatorSpec) -> HarnessResult<Probe> {
        let value = self.eval_value(probe_expression(spec)?).await?;
        if let Some(error) = value.get("error").and_then(serde_json::Value::as_str) {
            return Err(HarnessError::script(format!("probe for {spec} threw: {error}")));
        }
        serde_json::from_value(value).map_err(protocol)
    }

    async fn click(&self, path: &NodePath) -> HarnessResult<()> {
        let value = self.eval_value(center_expression(path)?).await?;
        let point: Option<Point> = serde_json::from_value(value).map_err(protocol)?;
        let Some(Point { x, y }) = point else {
            return Err(HarnessError::action(path.to_string(), "element is detached"));
        };
        self.mouse(DispatchMouseEventType::MouseMoved, x, y).await?;
        self.mouse(DispatchMouseEventType::MousePressed, x, y).await?;
        self.mouse(DispatchMouseEventType::MouseReleased, x, y).await
    }

    async fn fill(&self, path: &NodePath, value: &str) -> HarnessResult<()> {
        let focused = self.eval_value(focus_clear_expression(path)?).await?;
        if focused != serde_json::Value::Bool(true) {
            return Err(HarnessError::action(path.to_string(), "element is detached"));
        }
        if !value.is_empty() {
            self.page
                .execute(InsertTextParams::new(value))
                .await
                .map_err(protocol)?;
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> HarnessResult<serde_json::Value> {
        self.eval_value(script.to_string()).await
    }

    async fn add_init_script(&self, source: &str) -> HarnessResult<()> {
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(source))
            .await
            .map_err(script)?;
        Ok(())
    }

    async fn set_viewport(
        &self,
        width: u32,
        height: u32,
        device_scale_factor: f64,
    ) -> HarnessResult<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(width))
            .height(i64::from(height))
            .device_scale_factor(device_scale_factor)
            .mobile(false)
            .build()
            .map_err(protocol)?;
        self.page.execute(params).await.map_err(protocol)?;
        Ok(())
    }

    async fn screenshot(&self, scope: CaptureScope) -> HarnessResult<Vec<u8>> {
        let metrics = self.metrics().await?;
        let clip = match scope {
            CaptureScope::FullPage => ClipRect {
                x: 0.0,
                y: 0.0,
                width: metrics.width,
                height: metrics.height,
                scale: 1.0,
            },
            CaptureScope::Viewport => ClipRect {
                x: metrics.scroll_x,
                y: metrics.scroll_y,
                width: metrics.inner_width,
                height: metrics.inner_height,
                scale: 1.0,
            },
            CaptureScope::Clip(rect) => ClipRect {
                x: rect.x + metrics.scroll_x,
                y: rect.y + metrics.scroll_y,
                width: rect.width,
                height: rect.height,
                scale: 1.0,
            },
        };
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .capture_beyond_viewport(true)
            .clip(clip)
            .build();
        let response = self
            .page
            .execute(params)
            .await
            .map_err(|e| HarnessError::screenshot(e.to_string()))?;
        let data: &str = response.data.as_ref();
        base64::engine::general_purpose::STANDARD
            .decode(data.as_bytes())
            .map_err(|e| HarnessError::screenshot(format!("base64 decode failed: {e}")))
    }

    fn console_messages(&self) -> Vec<ConsoleMessage> {
        self.console.messages()
    }

    async fn close(&self) -> HarnessResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(HarnessError::protocol("session already closed"));
        }
        let result = {
            let mut browser = self.browser.lock().await;
            match browser.close().await {
                Ok(_) => browser.wait().await.map(|_| ()).map_err(protocol),
                Err(e) => Err(protocol(e)),
            }
        };
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
        result
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}
