//! City and carrier via restrictions: 1, 2, 5, 9, 10, 18, 19, 21.

use std::collections::HashSet;

use crate::restrictions::{apply, touching, RestrictionContext, RestrictionValidator};
use crate::routing::types::{RoutingRestriction, ViaAppl};
use crate::travel::types::TravelRoute;

#[derive(Debug, Clone, Copy, Default)]
pub struct CityCarrierRestrictionValidator;

impl CityCarrierRestrictionValidator {
    /// 1: between market1 and market2 travel must (not) be via city3.
    fn between_via_city(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        match ctx.between(route, r) {
            Some((lo, hi)) => apply(r.appl, ctx.via_inside(route, r, lo, hi)),
            None => true,
        }
    }

    /// 2: travel must (not) be via city3, a city, nation or zone.
    fn via(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        let last = route.points().len().saturating_sub(1);
        apply(r.appl, ctx.via_inside(route, r, 0, last))
    }

    /// 5: travel to/from market1 must (not) be via city3.
    fn to_from_via_city(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        if ctx.position(route, &r.market1, r.market1_type).is_none() {
            return true;
        }
        let last = route.points().len().saturating_sub(1);
        apply(r.appl, ctx.via_inside(route, r, 0, last))
    }

    /// 9: travel may not return through the fare origin.
    fn not_via_origin(&self, route: &TravelRoute, r: &RoutingRestriction) -> bool {
        if r.appl == ViaAppl::Permitted {
            return true;
        }
        let points = route.points();
        let Some(origin) = points.first() else {
            return true;
        };
        let last = points.len().saturating_sub(1);
        !points[1..last.max(1)].iter().any(|p| p.code == origin.code)
    }

    /// 10: at most one coupon between the same points in the same direction.
    fn no_repeated_sector(&self, route: &TravelRoute, r: &RoutingRestriction) -> bool {
        if r.appl == ViaAppl::Permitted {
            return true;
        }
        let mut seen = HashSet::new();
        route
            .route
            .iter()
            .all(|cc| seen.insert((cc.board.code.as_str(), cc.off.code.as_str())))
    }

    /// 18: between market1 and market2 travel must (not) be via the carrier.
    fn between_via_carrier(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        let Some((lo, hi)) = ctx.between(route, r) else {
            return true;
        };
        let flown: Vec<&str> = route.route[lo..hi]
            .iter()
            .filter(|cc| !cc.is_surface())
            .map(|cc| cc.carrier.as_str())
            .collect();
        match r.appl {
            ViaAppl::Required => !flown.is_empty() && flown.iter().all(|c| *c == r.via_carrier),
            ViaAppl::NotPermitted => flown.iter().all(|c| *c != r.via_carrier),
            _ => true,
        }
    }

    /// 19: travel to/from market1 must (not) be via the carrier.
    fn to_from_via_carrier(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        let steps = touching(route, ctx, &r.market1, r.market1_type);
        if steps.is_empty() {
            return true;
        }
        let on_carrier = steps
            .iter()
            .any(|(_, cc)| !cc.is_surface() && cc.carrier == r.via_carrier);
        apply(r.appl, on_carrier)
    }

    /// 21: when origin is market1 and destination is market2, travel must (not) be via city3.
    fn od_via_city(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        let (Some(origin), Some(destination)) = (route.origin(), route.destination()) else {
            return true;
        };
        if !ctx.loc_matches(origin, &r.market1, r.market1_type)
            || !ctx.loc_matches(destination, &r.market2, r.market2_type)
        {
            return true;
        }
        let last = route.points().len().saturating_sub(1);
        apply(r.appl, ctx.via_inside(route, r, 0, last))
    }
}

impl RestrictionValidator for CityCarrierRestrictionValidator {
    fn validate(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        let valid = match r.number {
            1 => self.between_via_city(route, r, ctx),
            2 => self.via(route, r, ctx),
            5 => self.to_from_via_city(route, r, ctx),
            9 => self.not_via_origin(route, r),
            10 => self.no_repeated_sector(route, r),
            18 => self.between_via_carrier(route, r, ctx),
            19 => self.to_from_via_carrier(route, r, ctx),
            21 => self.od_via_city(route, r, ctx),
            _ => true,
        };
        tracing::trace!(restriction = r.number, valid, "City/carrier restriction");
        valid
    }
}
