//! Fare Routing Validation Library
//!
//! Decides whether the flown itinerary of a priced airline fare satisfies the
//! routing filed for it: a specified routing map, or mileage rules, each
//! constrained further by numbered restrictions.

// Routing core
pub mod drv;
pub mod mileage;
pub mod restrictions;
pub mod routing;

// Orchestration
pub mod controller;

// Inputs
pub mod data;
pub mod fare;
pub mod travel;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;

pub use config::FareRoutingConfig;
pub use controller::{PricingContext, RoutingController};
pub use data::{DataHandle, InMemoryDataHandle};
pub use error::{DrvReason, RoutingError};
