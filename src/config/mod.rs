//! Validation settings loaded from TOML.
//!
//! # Data Flow
//! ```text
//! fare-routing.toml
//!     → loader.rs (toml into FareRoutingConfig)
//!     → validation.rs (cache capacity, surcharge cap, log filter)
//!     → RoutingController::new reads it once per transaction
//! ```
//!
//! # Design Decisions
//! - Every section is optional; an empty file yields the defaults
//! - Every semantic problem is reported, not only the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{CacheConfig, FareRoutingConfig, MileageConfig, ObservabilityConfig, ValidationConfig};
pub use validation::{validate_config, ValidationError};
