//! Filed routing data model.
//!
//! A `Routing` owns its map rows and restriction rows as plain values. The
//! compiled graph (`SpecifiedRouting`) is derived from an immutable borrow
//! and never writes back.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Routing number reserved for mileage-basis routings (no graph).
pub const MILEAGE_ROUTING: &str = "00000";

/// Industry carrier code: any carrier may be used.
pub const INDUSTRY_CARRIER: &str = "YY";

/// Pseudo carrier of a surface sector.
pub const SURFACE_CARRIER: &str = "XX";

/// Identity of a filed routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoutingId {
    pub vendor: String,
    pub carrier: String,
    pub tariff: u16,
    pub number: String,
}

impl RoutingId {
    pub fn new(
        vendor: impl Into<String>,
        carrier: impl Into<String>,
        tariff: u16,
        number: impl Into<String>,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            carrier: carrier.into(),
            tariff,
            number: number.into(),
        }
    }

    /// Same vendor, carrier and tariff with another routing number.
    pub fn with_number(&self, number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for RoutingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.vendor, self.carrier, self.tariff, self.number)
    }
}

/// Location type of a map row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapLocType {
    #[serde(rename = "C")]
    City,
    #[serde(rename = "A")]
    Airline,
    #[serde(rename = "N")]
    Nation,
    #[serde(rename = "Z")]
    Zone,
    /// Catch-all point: matches any city.
    #[serde(rename = "*")]
    Any,
}

/// Position tag of a map row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MapTag {
    #[serde(rename = "1")]
    Entry,
    #[default]
    #[serde(rename = " ")]
    Connect,
    #[serde(rename = "X")]
    Exit,
}

/// One graph node row of a specified routing map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingMapRow {
    pub seq: u16,
    #[serde(default)]
    pub tag: MapTag,
    /// Next required node, 0 when this is the end of a chain.
    #[serde(default)]
    pub next: u16,
    /// Mutually-exclusive sibling, 0 when none.
    #[serde(default)]
    pub alt: u16,
    pub loc_type: MapLocType,
    pub code: String,
}

impl RoutingMapRow {
    pub fn new(
        seq: u16,
        tag: MapTag,
        next: u16,
        alt: u16,
        loc_type: MapLocType,
        code: impl Into<String>,
    ) -> Self {
        Self {
            seq,
            tag,
            next,
            alt,
            loc_type,
            code: code.into(),
        }
    }
}

/// Location type of a restriction market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum LocType {
    #[default]
    #[serde(rename = "C")]
    City,
    #[serde(rename = "N")]
    Nation,
    #[serde(rename = "Z")]
    Zone,
}

/// Via-application flag of a restriction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ViaAppl {
    #[serde(rename = "R")]
    Required,
    #[serde(rename = "P")]
    Permitted,
    #[serde(rename = "N")]
    NotPermitted,
    #[default]
    #[serde(rename = " ")]
    Blank,
}

impl ViaAppl {
    /// Permitted or required.
    pub fn is_positive(self) -> bool {
        matches!(self, ViaAppl::Permitted | ViaAppl::Required)
    }
}

/// Nonstop/direct indicator of restrictions 3, 4 and 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NonStopDirect {
    #[serde(rename = "N")]
    Nonstop,
    #[serde(rename = "D")]
    Direct,
    #[serde(rename = "E")]
    Either,
    #[default]
    #[serde(rename = " ")]
    Blank,
}

/// Air/surface indicator of restrictions 11 and 13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AirSurface {
    #[serde(rename = "A")]
    Air,
    #[serde(rename = "S")]
    Surface,
    #[serde(rename = "E")]
    Either,
    #[default]
    #[serde(rename = " ")]
    Blank,
}

/// One numbered restriction row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoutingRestriction {
    pub number: u8,
    pub market1: String,
    pub market1_type: LocType,
    pub market2: String,
    pub market2_type: LocType,
    pub via_market: String,
    pub via_type: LocType,
    pub via_carrier: String,
    pub appl: ViaAppl,
    pub nonstop_direct: NonStopDirect,
    pub air_surface: AirSurface,
    pub mpm: u32,
}

impl RoutingRestriction {
    pub fn new(number: u8, appl: ViaAppl) -> Self {
        Self {
            number,
            appl,
            ..Self::default()
        }
    }

    pub fn between(mut self, market1: impl Into<String>, market2: impl Into<String>) -> Self {
        self.market1 = market1.into();
        self.market2 = market2.into();
        self
    }

    pub fn via(mut self, via: impl Into<String>, via_type: LocType) -> Self {
        self.via_market = via.into();
        self.via_type = via_type;
        self
    }

    pub fn via_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.via_carrier = carrier.into();
        self
    }
}

/// Domestic routing validation indicator of a routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DomesticValidation {
    #[default]
    Validate,
    NotApplicable,
    PassAnyOnlinePoint,
}

/// A filed routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routing {
    #[serde(flatten)]
    pub id: RoutingId,
    #[serde(default)]
    pub effective: Option<NaiveDate>,
    #[serde(default)]
    pub maps: Vec<RoutingMapRow>,
    #[serde(default)]
    pub restrictions: Vec<RoutingRestriction>,
    /// Must be traveled in the filed direction only.
    #[serde(default)]
    pub directional: bool,
    /// Travel must begin at entry points of the map.
    #[serde(default)]
    pub terminal_points_only: bool,
    #[serde(default)]
    pub domestic_validation: DomesticValidation,
    #[serde(default)]
    pub common_point: bool,
}

impl Routing {
    pub fn new(id: RoutingId) -> Self {
        Self {
            id,
            effective: None,
            maps: Vec::new(),
            restrictions: Vec::new(),
            directional: false,
            terminal_points_only: false,
            domestic_validation: DomesticValidation::Validate,
            common_point: false,
        }
    }

    pub fn with_map(mut self, row: RoutingMapRow) -> Self {
        self.maps.push(row);
        self
    }

    pub fn with_restriction(mut self, restriction: RoutingRestriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    pub fn is_mileage(&self) -> bool {
        self.id.number == MILEAGE_ROUTING
    }

    pub fn has_maps(&self) -> bool {
        !self.maps.is_empty()
    }

    /// Whether the row is effective on the given date.
    pub fn is_effective(&self, date: NaiveDate) -> bool {
        self.effective.map_or(true, |eff| eff <= date)
    }
}

pub fn is_mileage_number(number: &str) -> bool {
    number == MILEAGE_ROUTING
}
