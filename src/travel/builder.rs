//! Travel route assembly and splitting.
//!
//! # Responsibilities
//! - Build a `TravelRoute` from flown segments (one city-carrier step per coupon)
//! - Split a constructed itinerary at its gateways into add-on and base portions
//! - Cache travel routes per fare market and per route identity
//!
//! # Design Decisions
//! - `route[i]` is always derived from `segments[i]`, so indices agree
//! - Gateways that cannot be found fall back to country boundaries
//! - Cached routes are shared via `Arc` and never mutated

use std::ops::Range;
use std::sync::Arc;

use dashmap::DashMap;

use crate::fare::FareMarket;
use crate::travel::types::{CityCarrier, TravelRoute, TravelSeg};

/// Build a route whose steps mirror the given segments.
pub fn route_from_segments(
    segments: Vec<TravelSeg>,
    governing_carrier: impl Into<String>,
    primary_sector: Option<usize>,
) -> TravelRoute {
    let route = segments.iter().map(CityCarrier::from).collect();
    TravelRoute {
        route,
        segments,
        governing_carrier: governing_carrier.into(),
        primary_sector,
    }
}

/// Portion of a route covering `range` of its segments.
pub fn sub_route(route: &TravelRoute, range: Range<usize>) -> TravelRoute {
    let end = range.end.min(route.segments.len());
    let start = range.start.min(end);
    let primary = route
        .primary_sector
        .filter(|p| (start..end).contains(p))
        .map(|p| p - start);
    route_from_segments(
        route.segments[start..end].to_vec(),
        route.governing_carrier.clone(),
        primary,
    )
}

/// Concatenation of two adjacent portions.
pub fn join_routes(first: &TravelRoute, second: &TravelRoute) -> TravelRoute {
    let offset = first.segments.len();
    let primary = first
        .primary_sector
        .or_else(|| second.primary_sector.map(|p| p + offset));
    let mut segments = first.segments.clone();
    segments.extend(second.segments.iter().cloned());
    route_from_segments(segments, first.governing_carrier.clone(), primary)
}

/// Travel route portions of a constructed fare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteComponents {
    pub orig_addon: Option<TravelRoute>,
    pub base: TravelRoute,
    pub dest_addon: Option<TravelRoute>,
}

/// Split a route at the add-on gateways.
///
/// A gateway that is not on the route falls back to the last point still
/// inside the origin country (or the first inside the destination country).
pub fn split_at_gateways(
    route: &TravelRoute,
    orig_gateway: Option<&str>,
    dest_gateway: Option<&str>,
) -> RouteComponents {
    let points = route.points();
    let n = route.segments.len();

    let first = match orig_gateway {
        None => 0,
        Some(gw) => points
            .iter()
            .position(|p| p.code == gw)
            .unwrap_or_else(|| leading_domestic(route)),
    };
    let last = match dest_gateway {
        None => n,
        Some(gw) => points
            .iter()
            .rposition(|p| p.code == gw)
            .unwrap_or_else(|| n - trailing_domestic(route))
            .max(first),
    };

    RouteComponents {
        orig_addon: orig_gateway.map(|_| sub_route(route, 0..first)),
        base: sub_route(route, first..last),
        dest_addon: dest_gateway.map(|_| sub_route(route, last..n)),
    }
}

/// Number of leading segments wholly inside the origin country, before the primary sector.
pub fn leading_domestic(route: &TravelRoute) -> usize {
    let Some(origin) = route.origin() else {
        return 0;
    };
    let limit = route.primary_sector.unwrap_or(route.segments.len());
    route.segments[..limit.min(route.segments.len())]
        .iter()
        .take_while(|seg| seg.is_within(&origin.nation))
        .count()
}

/// Number of trailing segments wholly inside the destination country, after the primary sector.
pub fn trailing_domestic(route: &TravelRoute) -> usize {
    let Some(dest) = route.destination() else {
        return 0;
    };
    let start = route.primary_sector.map_or(0, |p| p + 1);
    route.segments[start.min(route.segments.len())..]
        .iter()
        .rev()
        .take_while(|seg| seg.is_within(&dest.nation))
        .count()
}

/// Transaction-scoped travel route cache.
///
/// Routes are looked up by fare market id first and deduplicated by route
/// identity so that markets flying the same coupons share one route.
#[derive(Clone, Default)]
pub struct TravelRouteCache {
    by_market: Arc<DashMap<String, Arc<TravelRoute>>>,
    by_hash: Arc<DashMap<String, Arc<TravelRoute>>>,
}

impl TravelRouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route of a fare market, built once.
    pub fn get_or_build(&self, market: &FareMarket) -> Arc<TravelRoute> {
        if let Some(route) = self.by_market.get(&market.id) {
            return route.value().clone();
        }
        let built = route_from_segments(
            market.segments.clone(),
            market.governing_carrier.clone(),
            market.primary_sector,
        );
        let shared = self
            .by_hash
            .entry(built.hash_key())
            .or_insert_with(|| Arc::new(built))
            .value()
            .clone();
        self.by_market
            .entry(market.id.clone())
            .or_insert(shared)
            .value()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.by_market.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_market.is_empty()
    }
}
