//! Numbered routing restrictions.
//!
//! # Data Flow
//! ```text
//! Routing.restrictions[]
//!     → combine.rs (exclusions, OR/AND grouping by restriction key)
//!     → validator_for(number) (factory)
//!     → per-number validator (city_carrier, nonstop, stopover, air_surface, rtw)
//!     → RestrictionInfo per row, one verdict per routing component
//!
//! Per component only:
//!     carrier_list.rs (restriction 17), rtw.rs grouping (restriction 12)
//! ```
//!
//! # Design Decisions
//! - Validators are stateless unit structs behind one trait seam
//! - A restriction whose markets are not on the route does not apply and passes
//! - Permitted rows never fail on their own; only required/not-permitted bite

use serde::{Deserialize, Serialize};

use crate::data::DataHandle;
use crate::routing::types::{LocType, RoutingRestriction, ViaAppl};
use crate::travel::types::{CityCarrier, Loc, TravelRoute};

pub mod air_surface;
pub mod carrier_list;
pub mod city_carrier;
pub mod combine;
pub mod nonstop;
pub mod rtw;
pub mod stopover;

pub use combine::{process_restrictions, RestrictionKey, RestrictionOutcome};

/// Portion of a journey a restriction verdict belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Component {
    /// A non-constructed fare's whole route.
    #[default]
    Whole,
    OrigAddon,
    Base,
    DestAddon,
}

/// Verdict of one restriction row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionInfo {
    pub number: u8,
    pub component: Component,
    pub processed: bool,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl RestrictionInfo {
    pub fn new(number: u8, component: Component, valid: bool) -> Self {
        Self {
            number,
            component,
            processed: true,
            valid,
            detail: String::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// What a validator may look at besides the route and the row.
#[derive(Clone, Copy)]
pub struct RestrictionContext<'a> {
    pub data: &'a dyn DataHandle,
    pub vendor: &'a str,
    /// Carrier of the routing being validated.
    pub routing_carrier: &'a str,
    pub governing_carrier: &'a str,
    pub rtw: bool,
}

impl<'a> RestrictionContext<'a> {
    pub fn new(data: &'a dyn DataHandle, vendor: &'a str, routing_carrier: &'a str) -> Self {
        Self {
            data,
            vendor,
            routing_carrier,
            governing_carrier: routing_carrier,
            rtw: false,
        }
    }

    /// Whether `loc` is the city, inside the nation, or inside the zone.
    pub fn loc_matches(&self, loc: &Loc, market: &str, loc_type: LocType) -> bool {
        if market.is_empty() {
            return false;
        }
        match loc_type {
            LocType::City => loc.code == market,
            LocType::Nation => loc.nation == market,
            LocType::Zone => self
                .data
                .zone_nations(self.vendor, market)
                .is_some_and(|nations| nations.contains(&loc.nation)),
        }
    }

    /// First point index matching the market.
    pub fn position(&self, route: &TravelRoute, market: &str, loc_type: LocType) -> Option<usize> {
        route
            .points()
            .iter()
            .position(|p| self.loc_matches(p, market, loc_type))
    }

    /// Point range spanned by market1 and market2, in either order.
    pub fn between(&self, route: &TravelRoute, r: &RoutingRestriction) -> Option<(usize, usize)> {
        let a = self.position(route, &r.market1, r.market1_type)?;
        let b = self.position(route, &r.market2, r.market2_type)?;
        Some((a.min(b), a.max(b)))
    }

    /// Whether any point strictly inside `lo..hi` matches the via market.
    pub fn via_inside(&self, route: &TravelRoute, r: &RoutingRestriction, lo: usize, hi: usize) -> bool {
        let points = route.points();
        (lo + 1..hi).any(|i| self.loc_matches(points[i], &r.via_market, r.via_type))
    }
}

impl std::fmt::Debug for RestrictionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestrictionContext")
            .field("vendor", &self.vendor)
            .field("routing_carrier", &self.routing_carrier)
            .field("governing_carrier", &self.governing_carrier)
            .field("rtw", &self.rtw)
            .finish()
    }
}

/// Validates one numbered restriction row against a route.
pub trait RestrictionValidator: Send + Sync + std::fmt::Debug {
    /// Returns true if the route satisfies the row.
    fn validate(&self, route: &TravelRoute, restriction: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool;
}

/// Restrictions that carry information only.
#[derive(Debug, Clone, Copy, Default)]
pub struct InformationalRestriction;

impl RestrictionValidator for InformationalRestriction {
    fn validate(&self, _route: &TravelRoute, _restriction: &RoutingRestriction, _ctx: &RestrictionContext<'_>) -> bool {
        true
    }
}

/// Restriction numbers combined with OR when filed as permitted or required.
pub fn is_positive_number(number: u8) -> bool {
    matches!(number, 1 | 2 | 4 | 5 | 7 | 8 | 9 | 10 | 18 | 19 | 21)
}

/// Validator for a restriction number; `None` for numbers with no known rule.
pub fn validator_for(number: u8) -> Option<&'static dyn RestrictionValidator> {
    static CITY_CARRIER: city_carrier::CityCarrierRestrictionValidator =
        city_carrier::CityCarrierRestrictionValidator;
    static NONSTOP: nonstop::NonStopDirectRestrictionValidator =
        nonstop::NonStopDirectRestrictionValidator;
    static STOPOVER: stopover::StopoverRestrictionValidator = stopover::StopoverRestrictionValidator;
    static LOCAL_TRAFFIC: stopover::LocalTrafficRestrictionValidator =
        stopover::LocalTrafficRestrictionValidator;
    static AIR_SURFACE: air_surface::AirSurfaceRestrictionValidator =
        air_surface::AirSurfaceRestrictionValidator;
    static RTW_MILEAGE: rtw::RtwMileageRestrictionValidator = rtw::RtwMileageRestrictionValidator;
    static INFORMATIONAL: InformationalRestriction = InformationalRestriction;

    match number {
        1 | 2 | 5 | 9 | 10 | 18 | 19 | 21 => Some(&CITY_CARRIER),
        3 | 4 | 6 => Some(&NONSTOP),
        7 => Some(&STOPOVER),
        14 => Some(&LOCAL_TRAFFIC),
        11 => Some(&AIR_SURFACE),
        8 => Some(&RTW_MILEAGE),
        13 | 15 | 16 => Some(&INFORMATIONAL),
        _ => None,
    }
}

/// Verdict for rows where `satisfied` is the required condition.
pub(crate) fn apply(appl: ViaAppl, satisfied: bool) -> bool {
    match appl {
        ViaAppl::Required => satisfied,
        ViaAppl::NotPermitted => !satisfied,
        ViaAppl::Permitted | ViaAppl::Blank => true,
    }
}

/// Steps with a board or off point matching the market.
pub(crate) fn touching<'r>(
    route: &'r TravelRoute,
    ctx: &RestrictionContext<'_>,
    market: &str,
    loc_type: LocType,
) -> Vec<(usize, &'r CityCarrier)> {
    route
        .route
        .iter()
        .enumerate()
        .filter(|(_, cc)| ctx.loc_matches(&cc.board, market, loc_type) || ctx.loc_matches(&cc.off, market, loc_type))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryDataHandle;

    #[test]
    fn test_factory_covers_catalog() {
        for number in [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 14, 15, 16, 18, 19, 21] {
            assert!(validator_for(number).is_some(), "restriction {number}");
        }
        assert!(validator_for(12).is_none());
        assert!(validator_for(17).is_none());
        assert!(validator_for(99).is_none());
    }

    #[test]
    fn test_zone_market() {
        let mut data = InMemoryDataHandle::new();
        data.add_zone("210", ["PL", "GB"]);
        let ctx = RestrictionContext::new(&data, "ATP", "AA");
        assert!(ctx.loc_matches(&Loc::new("WAW", "PL"), "210", LocType::Zone));
        assert!(!ctx.loc_matches(&Loc::new("NYC", "US"), "210", LocType::Zone));
        assert!(!ctx.loc_matches(&Loc::new("NYC", "US"), "", LocType::City));
    }

    #[test]
    fn test_positive_numbers() {
        assert!(is_positive_number(2));
        assert!(!is_positive_number(16));
        assert!(!is_positive_number(17));
    }
}
