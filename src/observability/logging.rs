//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Resolve the log filter from `RUST_LOG`, then config
//!
//! # Design Decisions
//! - Logs go to stderr so JSON results on stdout stay parseable
//! - Initialization is idempotent; a second call is a no-op

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither the environment nor config provide one.
pub const DEFAULT_FILTER: &str = "fare_routing=info";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `filter`. An unparsable filter falls back to
/// [`DEFAULT_FILTER`].
pub fn init_logging(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
