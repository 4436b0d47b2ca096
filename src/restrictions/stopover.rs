//! Stopover restrictions: 7 and 14.

use crate::restrictions::{apply, RestrictionContext, RestrictionValidator};
use crate::routing::types::{RoutingRestriction, ViaAppl};
use crate::travel::types::TravelRoute;

/// Point indices where the passenger stops over, excluding origin and destination.
fn stopover_points(route: &TravelRoute) -> Vec<usize> {
    let last = route.route.len().saturating_sub(1);
    route.route[..last]
        .iter()
        .enumerate()
        .filter(|(_, cc)| cc.stopover)
        .map(|(i, _)| i + 1)
        .collect()
}

/// 7: between market1 and market2 a stopover in city3 is required, permitted or not permitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopoverRestrictionValidator;

impl RestrictionValidator for StopoverRestrictionValidator {
    fn validate(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        let Some((lo, hi)) = ctx.between(route, r) else {
            return true;
        };
        let points = route.points();
        let stopped = stopover_points(route)
            .into_iter()
            .filter(|i| (lo + 1..hi).contains(i))
            .any(|i| r.via_market.is_empty() || ctx.loc_matches(points[i], &r.via_market, r.via_type));
        apply(r.appl, stopped)
    }
}

/// 14: no local traffic.
///
/// Stopovers break the journey into portions; a portion that starts and ends
/// inside one nation carries local traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTrafficRestrictionValidator;

impl RestrictionValidator for LocalTrafficRestrictionValidator {
    fn validate(&self, route: &TravelRoute, r: &RoutingRestriction, _ctx: &RestrictionContext<'_>) -> bool {
        if r.appl == ViaAppl::Permitted {
            return true;
        }
        let stops = stopover_points(route);
        if stops.is_empty() {
            return true;
        }
        let points = route.points();
        let mut breaks = Vec::with_capacity(stops.len() + 2);
        breaks.push(0);
        breaks.extend(stops);
        breaks.push(points.len() - 1);

        let local = breaks.windows(2).find(|w| {
            let nation = &points[w[0]].nation;
            points[w[0]..=w[1]].iter().all(|p| &p.nation == nation)
        });
        if let Some(w) = local {
            tracing::trace!(
                from = %points[w[0]].code,
                to = %points[w[1]].code,
                "Local traffic portion"
            );
        }
        local.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryDataHandle;
    use crate::restrictions::testing::{route, route_in};
    use crate::routing::types::LocType;

    fn stop_at(mut trip: TravelRoute, point: usize) -> TravelRoute {
        trip.route[point - 1].stopover = true;
        trip.segments[point - 1].stopover = true;
        trip
    }

    #[test]
    fn test_stopover_between_markets() {
        let data = InMemoryDataHandle::new();
        let ctx = RestrictionContext::new(&data, "ATP", "AA");
        let v = StopoverRestrictionValidator;
        let trip = stop_at(route(&["NYC", "AA", "CHI", "AA", "DEN", "AA", "LAX"]), 1);

        let in_chi = |appl| RoutingRestriction::new(7, appl).between("NYC", "LAX").via("CHI", LocType::City);
        assert!(v.validate(&trip, &in_chi(ViaAppl::Required), &ctx));
        assert!(!v.validate(&trip, &in_chi(ViaAppl::NotPermitted), &ctx));
        assert!(v.validate(&trip, &in_chi(ViaAppl::Permitted), &ctx));

        let in_den = RoutingRestriction::new(7, ViaAppl::Required).between("NYC", "LAX").via("DEN", LocType::City);
        assert!(!v.validate(&trip, &in_den, &ctx));

        let outside = RoutingRestriction::new(7, ViaAppl::NotPermitted).between("DEN", "LAX");
        assert!(v.validate(&trip, &outside, &ctx));
    }

    #[test]
    fn test_local_traffic() {
        let data = InMemoryDataHandle::new();
        let ctx = RestrictionContext::new(&data, "ATP", "AA");
        let v = LocalTrafficRestrictionValidator;
        let row = RoutingRestriction::new(14, ViaAppl::NotPermitted);
        let nation = |c: &str| match c {
            "LON" | "MAN" => "GB",
            _ => "US",
        };

        let through = route_in(&["NYC", "AA", "BOS", "AA", "LON", "BA", "MAN"], nation);
        assert!(v.validate(&through, &row, &ctx));

        let stop_in_boston = stop_at(through.clone(), 1);
        assert!(!v.validate(&stop_in_boston, &row, &ctx));

        let stop_in_london = stop_at(
            route_in(&["NYC", "AA", "LON", "BA", "MAN", "BA", "PAR"], |c| match c {
                "LON" | "MAN" => "GB",
                "PAR" => "FR",
                _ => "US",
            }),
            1,
        );
        assert!(v.validate(&stop_in_london, &row, &ctx));

        assert!(v.validate(&stop_in_boston, &RoutingRestriction::new(14, ViaAppl::Permitted), &ctx));
    }
}
