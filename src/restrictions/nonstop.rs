//! Nonstop and direct service restrictions: 3, 4, 6.

use crate::restrictions::{apply, touching, RestrictionContext, RestrictionValidator};
use crate::routing::types::{NonStopDirect, RoutingRestriction, ViaAppl};
use crate::travel::types::{TravelRoute, TravelSeg};

#[derive(Debug, Clone, Copy, Default)]
pub struct NonStopDirectRestrictionValidator;

/// One coupon with no intermediate landing.
fn is_nonstop(segments: &[TravelSeg]) -> bool {
    matches!(segments, [only] if only.is_nonstop() && !only.is_surface())
}

/// One flight, possibly with landings: a single coupon or coupons sharing a flight number.
fn is_direct(segments: &[TravelSeg]) -> bool {
    match segments {
        [] => false,
        [only] => !only.is_surface(),
        [first, rest @ ..] => {
            first.flight_number != 0
                && rest
                    .iter()
                    .all(|s| s.carrier == first.carrier && s.flight_number == first.flight_number)
        }
    }
}

fn service_matches(indicator: NonStopDirect, segments: &[TravelSeg]) -> bool {
    match indicator {
        NonStopDirect::Nonstop => is_nonstop(segments),
        NonStopDirect::Direct => is_direct(segments),
        NonStopDirect::Either | NonStopDirect::Blank => is_nonstop(segments) || is_direct(segments),
    }
}

impl RestrictionValidator for NonStopDirectRestrictionValidator {
    fn validate(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        match r.number {
            3 => apply(r.appl, service_matches(r.nonstop_direct, &route.segments)),
            4 => match ctx.between(route, r) {
                Some((lo, hi)) => apply(r.appl, service_matches(r.nonstop_direct, &route.segments[lo..hi])),
                None => true,
            },
            6 => {
                let steps = touching(route, ctx, &r.market1, r.market1_type);
                if steps.is_empty() {
                    return true;
                }
                let served: Vec<bool> = steps
                    .iter()
                    .map(|(i, _)| service_matches(r.nonstop_direct, std::slice::from_ref(&route.segments[*i])))
                    .collect();
                match r.appl {
                    ViaAppl::Required => served.iter().all(|s| *s),
                    ViaAppl::NotPermitted => !served.iter().any(|s| *s),
                    _ => true,
                }
            }
            _ => true,
        }
    }
}
