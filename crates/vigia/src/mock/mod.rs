//! In-memory browser for tests.
//!
//! [`MockSite`] maps URL patterns to static [`MockDocument`] trees. Nodes can
//! carry shadow roots, nested frame documents, delayed mounting and
//! click-to-reveal behavior, which is enough to exercise locator resolution,
//! polling and the scenario runner without launching Chromium.

mod css;
mod dom;
mod driver;

pub use dom::{MockDocument, MockNode, MockSite};
pub use driver::{LaunchStats, MockBehavior, MockDriver, MockLauncher, PNG_MAGIC};
