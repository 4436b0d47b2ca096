//! Domestic Routing Validation (DRV).
//!
//! When a city is missing from an international map, the domestic portion
//! around it may instead be validated against the local carrier's own
//! routing. If that passes, the local portion is collapsed to one sector and
//! the international map is tried again.
//!
//! # Data Flow
//! ```text
//! MapInfo.missing_city_index
//!     → controller.rs: gate checks (index, carrier preference)
//!     → local_route.rs: local route around the missing city
//!     → local fare market → highest qualifying fares → local routing
//!     → local map or restrictions
//!     → local_route.rs: international route with the local portion collapsed
//!     → SpecifiedRoutingValidator on the international route
//!     → at most one retry for a distinct missing city
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DrvReason;
use crate::restrictions::RestrictionInfo;
use crate::routing::types::RoutingId;
use crate::routing::validator::MapInfo;

pub mod controller;
pub mod local_route;

pub use controller::{DrvController, DrvRequest};

/// Overall DRV outcome recorded on a `MapInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DrvStatus {
    #[default]
    NotPerformed,
    Passed,
    Failed,
}

/// Record of one DRV attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DrvInfo {
    pub missing_city: String,
    pub local_route: String,
    pub local_governing_carrier: String,
    /// Hidden stops of the primary sector were added to the local route.
    pub flight_stop_market: bool,
    pub fare_id: Option<String>,
    pub fare_amount: f64,
    pub routing: Option<RoutingId>,
    pub map_info: Option<MapInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<RestrictionInfo>,
    pub failure: Option<DrvReason>,
    pub valid: bool,
}

impl DrvInfo {
    pub(crate) fn failed(mut self, reason: DrvReason) -> Self {
        tracing::debug!(missing_city = %self.missing_city, %reason, "DRV not applied");
        self.failure = Some(reason);
        self.valid = false;
        self
    }
}
