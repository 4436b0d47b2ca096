//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define validation metrics (outcomes, memo and cache hits, DRV attempts)
//! - Install a Prometheus recorder and hand back its render handle
//!
//! # Metrics
//! - `fare_routing_validations_total` (counter): fare validations by result
//! - `fare_routing_validation_duration_seconds` (histogram): per fare market
//! - `fare_routing_memo_hits_total` (counter): routing memo lookups by outcome
//! - `fare_routing_graph_cache_hits_total` (counter): compiled graph lookups by outcome
//! - `fare_routing_drv_attempts_total` (counter): DRV attempts by result
//!
//! # Design Decisions
//! - Helpers wrap the macros so metric names live in one place
//! - Without an installed recorder the macros do nothing, which keeps tests quiet

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

fn outcome(flag: bool, yes: &'static str, no: &'static str) -> &'static str {
    if flag {
        yes
    } else {
        no
    }
}

/// Install the global Prometheus recorder.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Metrics recorder installed");
    Ok(handle)
}

pub fn record_validation(valid: bool) {
    ::metrics::counter!("fare_routing_validations_total", "result" => outcome(valid, "valid", "invalid"))
        .increment(1);
}

pub fn record_validation_duration(seconds: f64) {
    ::metrics::histogram!("fare_routing_validation_duration_seconds").record(seconds);
}

pub fn record_memo(hit: bool) {
    ::metrics::counter!("fare_routing_memo_hits_total", "outcome" => outcome(hit, "hit", "miss")).increment(1);
}

pub fn record_graph_cache(hit: bool) {
    ::metrics::counter!("fare_routing_graph_cache_hits_total", "outcome" => outcome(hit, "hit", "miss"))
        .increment(1);
}

pub fn record_drv_attempt(passed: bool) {
    ::metrics::counter!("fare_routing_drv_attempts_total", "result" => outcome(passed, "passed", "failed"))
        .increment(1);
}
