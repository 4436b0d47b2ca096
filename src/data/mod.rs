//! Data access collaborator.
//!
//! # Responsibilities
//! - Resolve filed routings by identity and date
//! - Provide carrier preferences, zones, mileage and alliance membership
//! - Resolve city codes to nations
//! - Look up local fare markets for domestic fallback validation
//!
//! # Design Decisions
//! - Trait object seam so the pricing pipeline can plug its own store
//! - Lookups return `Option`; absence is never an error at this layer
//! - `memory.rs` is the in-process implementation used by the CLI and tests

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fare::FareMarket;
use crate::routing::types::{Routing, RoutingId};

pub mod memory;

pub use memory::{DataSet, InMemoryDataHandle};

/// Per-carrier switches relevant to routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierPreference {
    pub carrier: String,
    /// Hidden stops of tracked flights are validated as points.
    #[serde(default)]
    pub flight_tracking: bool,
    /// Domestic routing validation may be applied outside US/CA territory.
    #[serde(default)]
    pub drv_outside_domestic: bool,
}

impl CarrierPreference {
    /// Default used when no preference row is filed.
    pub fn conservative(carrier: impl Into<String>) -> Self {
        Self {
            carrier: carrier.into(),
            flight_tracking: false,
            drv_outside_domestic: false,
        }
    }
}

/// Read-only access to filed data.
pub trait DataHandle: Send + Sync + std::fmt::Debug {
    /// Every filed row for the routing identity.
    fn get_routings(&self, id: &RoutingId) -> Vec<Arc<Routing>>;

    fn get_carrier_preference(&self, carrier: &str, date: NaiveDate) -> Option<CarrierPreference>;

    /// Nations belonging to a zone.
    fn zone_nations(&self, vendor: &str, zone: &str) -> Option<BTreeSet<String>>;

    /// Ticketed point mileage between two cities.
    fn tpm(&self, from: &str, to: &str) -> Option<u32>;

    /// Maximum permitted mileage of a market.
    fn mpm(&self, origin: &str, destination: &str, global_direction: &str) -> Option<u32>;

    /// Nation of a city code, independent of any itinerary.
    fn city_nation(&self, city: &str) -> Option<String>;

    /// Generic alliance code of a carrier, e.g. `*A`.
    fn alliance(&self, carrier: &str) -> Option<String>;

    /// Fare market for a local origin/destination on one carrier.
    fn local_fare_market(&self, origin: &str, destination: &str, carrier: &str)
        -> Option<FareMarket>;

    /// Latest routing row effective on `date`.
    fn get_routing(&self, id: &RoutingId, date: NaiveDate) -> Option<Arc<Routing>> {
        self.get_routings(id)
            .into_iter()
            .filter(|r| r.is_effective(date))
            .max_by_key(|r| r.effective)
    }

    /// Carrier preference, or the conservative default.
    fn carrier_preference_or_default(&self, carrier: &str, date: NaiveDate) -> CarrierPreference {
        self.get_carrier_preference(carrier, date).unwrap_or_else(|| {
            tracing::debug!(carrier = %carrier, "No carrier preference, using conservative default");
            CarrierPreference::conservative(carrier)
        })
    }
}
