//! Per-key and per-fare validation results.

use serde::{Deserialize, Serialize};

use crate::controller::key::RtgKey;
use crate::mileage::MileageInfo;
use crate::restrictions::RestrictionInfo;
use crate::routing::types::RoutingId;
use crate::routing::validator::MapInfo;

/// Everything learned while validating one `RtgKey`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingInfo {
    pub key: RtgKey,
    pub routing: Option<RoutingId>,
    pub orig_addon_routing: Option<RoutingId>,
    pub dest_addon_routing: Option<RoutingId>,
    /// Base map, or the origin add-on map when the base has none.
    pub map_info: Option<MapInfo>,
    /// Destination add-on map validated on its own portion.
    pub addon_map_info: Option<MapInfo>,
    pub restrictions: Vec<RestrictionInfo>,
    pub mileage_info: Option<MileageInfo>,
    pub restrictions_valid: bool,
    pub map_valid: bool,
    /// Mileage passed without the surcharge exception.
    pub mileage_valid: bool,
    /// Validated as a specified routing rather than on mileage.
    pub is_routing: bool,
    pub failure: Option<String>,
}

impl RoutingInfo {
    pub fn new(key: RtgKey) -> Self {
        Self {
            key,
            routing: None,
            orig_addon_routing: None,
            dest_addon_routing: None,
            map_info: None,
            addon_map_info: None,
            restrictions: Vec::new(),
            mileage_info: None,
            restrictions_valid: true,
            map_valid: true,
            mileage_valid: true,
            is_routing: true,
            failure: None,
        }
    }

    /// Valid apart from mileage, which stays provisional until the exception pass.
    pub fn provisional_valid(&self) -> bool {
        self.restrictions_valid && self.map_valid
    }

    pub fn routing_status(&self) -> bool {
        self.provisional_valid() && self.mileage_valid
    }
}

/// Routing verdict for one fare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareResult {
    pub fare_id: String,
    pub key: RtgKey,
    pub routing_valid: bool,
    pub is_routing: bool,
    pub surcharge_pct: u8,
    pub surcharge_amount: f64,
    /// The South Atlantic exception surcharge replaced the ordinary one.
    pub south_atlantic_exception: bool,
    /// The result was reused from an earlier fare with the same key.
    pub memo_hit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Results for every fare of a fare market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketResult {
    pub market_id: String,
    pub route: String,
    pub fares: Vec<FareResult>,
}

impl MarketResult {
    pub fn valid_count(&self) -> usize {
        self.fares.iter().filter(|f| f.routing_valid).count()
    }
}
