//! Routing validation memo key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fare::{Directionality, Fare, FareMarket};
use crate::routing::types::{Routing, MILEAGE_ROUTING};

/// Identity of one distinct routing validation.
///
/// Fares with equal keys on the same travel route share one result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RtgKey {
    pub vendor: String,
    pub carrier: String,
    pub tariff: u16,
    pub routing_number: String,
    /// Routing number of the origin add-on, in travel order.
    pub addon1: String,
    /// Routing number of the destination add-on, in travel order.
    pub addon2: String,
    pub dir_outbound: bool,
}

impl RtgKey {
    /// Build the key for a fare and its resolved routings.
    ///
    /// Without a routing row the identity comes from the fare and the market's
    /// governing carrier. Add-on numbers follow `Fare::add_ons`, so a reversed
    /// fare has them swapped. Direction only matters when mileage is involved.
    pub fn build(
        fare: &Fare,
        market: &FareMarket,
        routing: Option<&Routing>,
        orig_addon: Option<&Routing>,
        dest_addon: Option<&Routing>,
    ) -> Self {
        let (vendor, carrier, tariff, routing_number) = match routing {
            Some(r) => (r.id.vendor.clone(), r.id.carrier.clone(), r.id.tariff, r.id.number.clone()),
            None => (
                fare.routing_vendor().to_string(),
                market.governing_carrier.clone(),
                fare.tariff,
                fare.routing_number.clone(),
            ),
        };

        let (orig, dest) = fare.add_ons();
        let addon_number = |resolved: Option<&Routing>, filed: Option<&str>| -> String {
            match (resolved, filed) {
                (Some(r), _) => r.id.number.clone(),
                (None, Some(number)) if number != MILEAGE_ROUTING => number.to_string(),
                _ => String::new(),
            }
        };
        let addon1 = addon_number(orig_addon, orig.map(|a| a.routing_number.as_str()));
        let addon2 = addon_number(dest_addon, dest.map(|a| a.routing_number.as_str()));

        let mut key = Self {
            vendor,
            carrier,
            tariff,
            routing_number,
            addon1,
            addon2,
            dir_outbound: true,
        };
        if key.involves_mileage() {
            key.dir_outbound = fare.directionality == Directionality::From;
        }
        key
    }

    /// The base or an add-on is a mileage routing.
    pub fn involves_mileage(&self) -> bool {
        self.routing_number == MILEAGE_ROUTING || self.addon1 == MILEAGE_ROUTING || self.addon2 == MILEAGE_ROUTING
    }
}

impl fmt::Display for RtgKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.vendor, self.carrier, self.tariff, self.routing_number)?;
        if !self.addon1.is_empty() || !self.addon2.is_empty() {
            write!(f, "+{}+{}", self.addon1, self.addon2)?;
        }
        if !self.dir_outbound {
            write!(f, " IN")?;
        }
        Ok(())
    }
}
