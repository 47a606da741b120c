//! Vigia: UI verification harness for embedded web widgets
//!
//! Vigia drives a browser through declarative scenarios and reports a
//! verdict per scenario. Locators pierce nested iframes and open shadow
//! roots, and every wait is bounded.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        VIGIA Architecture                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌──────────┐ │
//! │  │ Scenario   │   │ Scenario   │   │ Locator    │   │ Driver   │ │
//! │  │ (YAML)     │──►│ Runner     │──►│ Resolver   │──►│ CDP/Mock │ │
//! │  └────────────┘   └─────┬──────┘   └────────────┘   └──────────┘ │
//! │                         │ Verdict                       ▲        │
//! │                         ▼                               │        │
//! │                   ┌────────────┐   ┌────────────┐       │        │
//! │                   │ Reporter   │   │ Session    │───────┘        │
//! │                   │ (artifacts)│   │ Manager    │                │
//! │                   └────────────┘   └────────────┘                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use vigia::mock::{MockDocument, MockLauncher, MockNode, MockSite};
//! use vigia::{LocatorSpec, RunnerOptions, Scenario, ScenarioRunner, SessionConfig, Step, SuiteRunner, UrlPattern};
//!
//! # async fn demo() -> vigia::HarnessResult<()> {
//! let site = MockSite::new().page(
//!     UrlPattern::Any,
//!     MockDocument::new("http://app/").child(MockNode::button("Entrar")),
//! );
//! let scenario = Scenario::builder("login")
//!     .step(Step::navigate("http://app/"))
//!     .step(Step::click(LocatorSpec::role_named("button", "Entrar")))
//!     .build()?;
//! let suite = SuiteRunner::new(
//!     MockLauncher::new(site),
//!     ScenarioRunner::new(RunnerOptions::default()),
//!     SessionConfig::default(),
//! );
//! let verdicts = suite.run(&[scenario]).await.into_result()?;
//! assert!(verdicts[0].passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod config;
mod driver;
mod network;
mod reporter;
#[allow(clippy::missing_errors_doc)]
mod resolver;
mod result;
#[allow(clippy::missing_errors_doc, clippy::too_many_lines)]
mod runner;
mod scenario;
#[allow(clippy::missing_errors_doc)]
mod session;
mod step;
#[allow(clippy::missing_errors_doc)]
mod suite;
mod verdict;

/// Locator model: frame hops, scopes, strategies and the element index
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod locator;

/// In-memory driver for tests: documents with frames, shadow roots and
/// timed mutations, evaluated on the tokio clock
#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
pub mod mock;

/// Bounded waits and page load states
#[allow(clippy::missing_errors_doc)]
pub mod wait;

/// Chromium over CDP
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc)]
mod cdp;

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, ChromiumLauncher, CHROMIUM_PATH_ENV};
pub use config::{HarnessConfig, CONFIG_FILE_NAMES};
pub use driver::{
    CaptureScope, ConsoleLevel, ConsoleMessage, ConsoleSink, Driver, Launcher, CONSOLE_TARGET,
};
pub use locator::{
    BoundingBox, ElementHandle, ElementSnapshot, FrameHop, Index, LocatorSpec, NodePath,
    PathStep, Probe, Selection, Strategy, TextMatch,
};
pub use network::{HttpMethod, MockResponse, MockRoute, RegexPattern, RouteTable, UrlPattern};
pub use reporter::{summary_line, Reporter, ScenarioReport, SuiteReport, WriteFailure};
pub use resolver::{not_found, Resolution, Resolver};
pub use result::{ErrorKind, HarnessError, HarnessResult};
pub use runner::{RunnerOptions, ScenarioRunner, DEFAULT_ARTIFACT_DIR, DEFAULT_STEP_TIMEOUT_MS};
pub use scenario::{Scenario, ScenarioBuilder};
pub use session::{Session, SessionConfig, SessionManager, Viewport, DEFAULT_NAVIGATION_TIMEOUT_MS};
pub use step::{ScreenshotScope, Step};
pub use suite::{SuiteOutcome, SuiteRunner};
pub use verdict::{
    Artifact, ArtifactKind, Failure, StepRecord, Verdict, VerdictRecorder, VerdictStatus,
};
pub use wait::{LoadState, WaitOptions};
