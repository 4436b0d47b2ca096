//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (cache capacity, surcharge cap)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FareRoutingConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::FareRoutingConfig;
use crate::mileage::SURCHARGE_BANDS;

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cache.graph_capacity must be greater than 0")]
    ZeroGraphCapacity,

    #[error("mileage.max_surcharge_pct must be one of 5, 10, 15, 20, 25 (got {0})")]
    InvalidSurchargeCap(u8),

    #[error("observability.log_filter must not be empty")]
    EmptyLogFilter,
}

pub fn validate_config(config: &FareRoutingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.cache.graph_capacity == 0 {
        errors.push(ValidationError::ZeroGraphCapacity);
    }

    let cap = config.mileage.max_surcharge_pct;
    if cap == 0 || !SURCHARGE_BANDS.contains(&cap) {
        errors.push(ValidationError::InvalidSurchargeCap(cap));
    }

    if config.observability.log_filter.trim().is_empty() {
        errors.push(ValidationError::EmptyLogFilter);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
