//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for routing
//! validation. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FareRoutingConfig {
    /// Validation switches.
    pub validation: ValidationConfig,

    /// Compiled graph cache settings.
    pub cache: CacheConfig,

    /// Mileage validation settings.
    pub mileage: MileageConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Validation switches.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Run domestic routing validation when a map misses a city.
    pub drv_enabled: bool,

    /// Treat the transaction as a round-the-world request.
    pub rtw: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            drv_enabled: true,
            rtw: false,
        }
    }
}

/// Compiled graph cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of compiled graphs retained per transaction.
    pub graph_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { graph_capacity: 4096 }
    }
}

/// Mileage validation settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MileageConfig {
    /// Highest surcharge band in percent (5..=25, multiple of 5).
    pub max_surcharge_pct: u8,
}

impl Default for MileageConfig {
    fn default() -> Self {
        Self { max_surcharge_pct: 25 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `tracing` filter directive, e.g. `fare_routing=debug`.
    pub log_filter: String,

    /// Install the Prometheus recorder.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "fare_routing=info".to_string(),
            metrics_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: FareRoutingConfig = toml::from_str("").unwrap();
        assert_eq!(config, FareRoutingConfig::default());
        assert!(config.validation.drv_enabled);
        assert_eq!(config.cache.graph_capacity, 4096);
    }

    #[test]
    fn test_partial_sections() {
        let config: FareRoutingConfig = toml::from_str(
            r#"
            [validation]
            rtw = true

            [mileage]
            max_surcharge_pct = 15
            "#,
        )
        .unwrap();
        assert!(config.validation.rtw);
        assert!(config.validation.drv_enabled);
        assert_eq!(config.mileage.max_surcharge_pct, 15);
        assert_eq!(config.observability.log_filter, "fare_routing=info");
    }
}
