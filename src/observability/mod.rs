//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Validation subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and histograms via `metrics`)
//!
//! Consumers:
//!     → stderr log stream, filtered by `RUST_LOG` or config
//!     → Prometheus text rendering (`validate --print-metrics`)
//! ```
//!
//! # Design Decisions
//! - Every validation carries a pricing context id in its log fields
//! - Metric updates are free when no recorder is installed

pub mod logging;
pub mod metrics;
