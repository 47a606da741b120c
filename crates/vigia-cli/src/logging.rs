//! Tracing subscriber setup

use crate::config::Verbosity;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` wins over the verbosity flags. `json` switches to one JSON
/// object per line. Calling this twice is a no-op.
pub fn init(verbosity: Verbosity, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(verbosity.is_verbose())
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
