//! Carrier list restriction 17.
//!
//! Every flown carrier of the portion must be one of the carriers named on
//! the component's restriction-17 rows, or the governing carrier. On
//! round-the-world journeys a carrier also passes when its alliance is named.

use std::collections::BTreeSet;

use crate::restrictions::RestrictionContext;
use crate::travel::types::TravelRoute;

/// Whether every flown carrier on `route` is in `carriers` or is the governing carrier.
pub fn carriers_listed(route: &TravelRoute, carriers: &BTreeSet<&str>, ctx: &RestrictionContext<'_>) -> bool {
    let mut valid = true;
    for cc in route.route.iter().filter(|cc| !cc.is_surface()) {
        let carrier = cc.carrier.as_str();
        if carrier == route.governing_carrier || carriers.contains(carrier) {
            continue;
        }
        let via_alliance = ctx.rtw
            && ctx
                .data
                .alliance(carrier)
                .is_some_and(|alliance| carriers.contains(alliance.as_str()));
        if !via_alliance {
            tracing::debug!(
                carrier = %carrier,
                board = %cc.board.code,
                off = %cc.off.code,
                "Carrier not on restriction 17 list"
            );
            valid = false;
        }
    }
    valid
}
