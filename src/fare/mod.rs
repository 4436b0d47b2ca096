//! Fares and fare markets as seen by routing validation.
//!
//! Fare subtypes are a closed `FareKind` tag resolved when the fare is
//! built. Validation matches on the tag and never re-derives the subtype.

use serde::{Deserialize, Serialize};

use crate::routing::types::{RoutingId, INDUSTRY_CARRIER};
use crate::travel::types::{Loc, TravelSeg};

/// Fare directionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Directionality {
    From,
    To,
    #[default]
    Between,
}

/// Add-on component of a constructed fare.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddOn {
    pub tariff: u16,
    pub routing_number: String,
    /// City where the add-on meets the specified fare.
    pub gateway: String,
}

/// Closed set of fare subtypes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum FareKind {
    #[default]
    Published,
    Industry,
    Negotiated,
    FareByRule {
        /// Vendor of the base fare the rule was built from.
        #[serde(default)]
        base_vendor: Option<String>,
    },
    Constructed {
        #[serde(default)]
        orig_addon: Option<AddOn>,
        #[serde(default)]
        dest_addon: Option<AddOn>,
    },
}

/// A priced fare requiring routing validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fare {
    pub id: String,
    pub vendor: String,
    pub carrier: String,
    pub tariff: u16,
    pub routing_number: String,
    pub amount: f64,
    #[serde(default)]
    pub directionality: Directionality,
    /// Priced against the direction of travel.
    #[serde(default)]
    pub reversed: bool,
    #[serde(default)]
    pub private_tariff: bool,
    #[serde(default)]
    pub kind: FareKind,
}

impl Fare {
    pub fn new(
        id: impl Into<String>,
        vendor: impl Into<String>,
        carrier: impl Into<String>,
        tariff: u16,
        routing_number: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            id: id.into(),
            vendor: vendor.into(),
            carrier: carrier.into(),
            tariff,
            routing_number: routing_number.into(),
            amount,
            directionality: Directionality::Between,
            reversed: false,
            private_tariff: false,
            kind: FareKind::Published,
        }
    }

    pub fn with_kind(mut self, kind: FareKind) -> Self {
        self.kind = kind;
        self
    }

    /// Vendor whose routings govern this fare.
    pub fn routing_vendor(&self) -> &str {
        match &self.kind {
            FareKind::FareByRule {
                base_vendor: Some(vendor),
            } => vendor,
            _ => &self.vendor,
        }
    }

    pub fn routing_id(&self) -> RoutingId {
        RoutingId::new(
            self.routing_vendor(),
            self.carrier.clone(),
            self.tariff,
            self.routing_number.clone(),
        )
    }

    pub fn is_constructed(&self) -> bool {
        matches!(self.kind, FareKind::Constructed { .. })
    }

    pub fn is_industry(&self) -> bool {
        matches!(self.kind, FareKind::Industry) || self.carrier == INDUSTRY_CARRIER
    }

    /// Origin and destination add-ons, in travel order.
    pub fn add_ons(&self) -> (Option<&AddOn>, Option<&AddOn>) {
        match &self.kind {
            FareKind::Constructed {
                orig_addon,
                dest_addon,
            } => {
                if self.reversed {
                    (dest_addon.as_ref(), orig_addon.as_ref())
                } else {
                    (orig_addon.as_ref(), dest_addon.as_ref())
                }
            }
            _ => (None, None),
        }
    }

    /// Published, public, not negotiated and not built by a fare rule.
    pub fn qualifies_for_drv(&self) -> bool {
        !self.private_tariff && matches!(self.kind, FareKind::Published | FareKind::Industry)
    }
}

/// A priced origin/destination market with its flown coupons and fares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareMarket {
    pub id: String,
    pub origin: Loc,
    pub destination: Loc,
    pub governing_carrier: String,
    pub segments: Vec<TravelSeg>,
    #[serde(default)]
    pub primary_sector: Option<usize>,
    #[serde(default)]
    pub global_direction: String,
    #[serde(default)]
    pub fares: Vec<Fare>,
}
