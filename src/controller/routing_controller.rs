//! Top-level routing validation for fare markets.
//!
//! # Responsibilities
//! - Resolve each fare's routing and add-on routings
//! - Memoize one validation per `RtgKey` and travel route
//! - Run restrictions, mileage, map validation and DRV in order
//! - Apply the South Atlantic surcharge exception across a market's fares
//!
//! # Data Flow
//! ```text
//! FareMarket
//!     → TravelRouteCache (one TravelRoute per market)
//!     → per fare: resolve routings → RtgKey → Memo
//!         miss: split components → restrictions → mileage (provisional)
//!               → map validation → DRV on a missing city
//!     → surcharge exception pass → FareResult per fare
//! ```
//!
//! # Design Decisions
//! - A mileage failure never fails a fare before the exception pass
//! - Map validation is skipped once restrictions have failed
//! - Memo entries are scoped by travel route so markets never share verdicts

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::FareRoutingConfig;
use crate::controller::info::{FareResult, MarketResult, RoutingInfo};
use crate::controller::key::RtgKey;
use crate::controller::memo::Memo;
use crate::data::DataHandle;
use crate::drv::{DrvController, DrvRequest};
use crate::error::{DrvReason, RoutingError};
use crate::fare::{Fare, FareMarket};
use crate::mileage::{surcharge_amount, MileageInfo, MileageValidator};
use crate::observability::metrics;
use crate::restrictions::combine::process_component_restrictions;
use crate::restrictions::{process_restrictions, Component, RestrictionContext, RestrictionOutcome};
use crate::routing::cache::GraphCache;
use crate::routing::types::{DomesticValidation, MapLocType, Routing, RoutingId, MILEAGE_ROUTING};
use crate::routing::validator::{MapInfo, SpecifiedRoutingValidator};
use crate::travel::builder::{join_routes, split_at_gateways, RouteComponents, TravelRouteCache};
use crate::travel::types::{same_territory, TravelRoute};

/// Transaction-wide inputs shared by every fare market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingContext {
    /// Correlates log events of one transaction.
    pub id: Uuid,
    pub travel_date: NaiveDate,
    /// Round-the-world request.
    pub rtw: bool,
}

impl PricingContext {
    pub fn new(travel_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            travel_date,
            rtw: false,
        }
    }

    pub fn with_rtw(mut self, rtw: bool) -> Self {
        self.rtw = rtw;
        self
    }
}

/// Routings resolved for one fare, in travel order.
#[derive(Debug, Default)]
struct Resolved {
    routing: Option<Arc<Routing>>,
    orig_addon: Option<Arc<Routing>>,
    dest_addon: Option<Arc<Routing>>,
    orig_gateway: Option<String>,
    dest_gateway: Option<String>,
    missing: Option<RoutingId>,
}

impl Resolved {
    fn is_constructed(&self) -> bool {
        self.orig_addon.is_some() || self.dest_addon.is_some()
    }
}

fn has_maps(routing: Option<&Routing>) -> bool {
    routing.is_some_and(Routing::has_maps)
}

fn same_number(a: Option<&Routing>, b: Option<&Routing>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a.id.number == b.id.number)
}

/// Route portions checked by the per-component restrictions.
///
/// An add-on filed under the base's routing number is validated together
/// with the base portion.
fn component_routes(
    route: &TravelRoute,
    comps: &RouteComponents,
    orig_same: bool,
    dest_same: bool,
) -> (Option<TravelRoute>, TravelRoute, Option<TravelRoute>) {
    match (orig_same, dest_same) {
        (true, true) => (Some(route.clone()), route.clone(), Some(route.clone())),
        (true, false) => {
            let joined = match &comps.orig_addon {
                Some(orig) => join_routes(orig, &comps.base),
                None => comps.base.clone(),
            };
            (Some(joined.clone()), joined, comps.dest_addon.clone())
        }
        (false, true) => {
            let joined = match &comps.dest_addon {
                Some(dest) => join_routes(&comps.base, dest),
                None => comps.base.clone(),
            };
            (comps.orig_addon.clone(), joined.clone(), Some(joined))
        }
        (false, false) => (comps.orig_addon.clone(), comps.base.clone(), comps.dest_addon.clone()),
    }
}

/// Validates the routing of every fare in a fare market.
#[derive(Clone)]
pub struct RoutingController {
    data: Arc<dyn DataHandle>,
    ctx: PricingContext,
    validator: SpecifiedRoutingValidator,
    drv: DrvController,
    mileage: MileageValidator,
    memo: Memo<(String, RtgKey), Arc<RoutingInfo>>,
    routes: TravelRouteCache,
    drv_enabled: bool,
}

impl RoutingController {
    pub fn new(data: Arc<dyn DataHandle>, config: &FareRoutingConfig, ctx: PricingContext) -> Self {
        let validator = SpecifiedRoutingValidator::new(data.clone(), GraphCache::new(config.cache.graph_capacity));
        let drv = DrvController::new(data.clone(), validator.clone());
        Self {
            data,
            ctx,
            validator,
            drv,
            mileage: MileageValidator::new(config.mileage.max_surcharge_pct),
            memo: Memo::new(),
            routes: TravelRouteCache::new(),
            drv_enabled: config.validation.drv_enabled,
        }
    }

    pub fn context(&self) -> &PricingContext {
        &self.ctx
    }

    /// Number of distinct validations performed so far.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Validate every fare of the market.
    pub fn process(&self, market: &FareMarket) -> MarketResult {
        let started = Instant::now();
        let route = self.routes.get_or_build(market);

        let validated: Vec<(&Fare, Arc<RoutingInfo>, bool)> = market
            .fares
            .iter()
            .map(|fare| {
                let (info, hit) = self.validate_fare_on(fare, market, &route);
                (fare, info, hit)
            })
            .collect();

        let exception = self.surcharge_exception_applies(validated.iter().map(|(_, info, _)| info.as_ref()));
        let fares: Vec<FareResult> = validated
            .iter()
            .map(|(fare, info, hit)| {
                let result = fare_result(fare, info, *hit, exception);
                metrics::record_validation(result.routing_valid);
                result
            })
            .collect();

        metrics::record_validation_duration(started.elapsed().as_secs_f64());
        let result = MarketResult {
            market_id: market.id.clone(),
            route: route.route_string(),
            fares,
        };
        tracing::info!(
            transaction = %self.ctx.id,
            market = %market.id,
            route = %result.route,
            fares = result.fares.len(),
            valid = result.valid_count(),
            "Fare market routing validated"
        );
        result
    }

    /// Routing info for one fare of the market, and whether it was memoized.
    pub fn validate_fare(&self, fare: &Fare, market: &FareMarket) -> (Arc<RoutingInfo>, bool) {
        let route = self.routes.get_or_build(market);
        self.validate_fare_on(fare, market, &route)
    }

    fn validate_fare_on(&self, fare: &Fare, market: &FareMarket, route: &TravelRoute) -> (Arc<RoutingInfo>, bool) {
        let resolved = self.resolve(fare);
        let key = RtgKey::build(
            fare,
            market,
            resolved.routing.as_deref(),
            resolved.orig_addon.as_deref(),
            resolved.dest_addon.as_deref(),
        );
        let memo_key = (route.hash_key(), key.clone());
        let (info, hit) = self.memo.get_or_compute(memo_key, || {
            Arc::new(self.validate_routing(key, fare, market, route, &resolved))
        });
        if hit {
            tracing::debug!(transaction = %self.ctx.id, fare = %fare.id, key = %info.key, "Routing result reused");
        }
        (info, hit)
    }

    fn resolve(&self, fare: &Fare) -> Resolved {
        let date = self.ctx.travel_date;
        let lookup = |id: RoutingId, missing: &mut Option<RoutingId>| -> Option<Arc<Routing>> {
            let found = self.data.get_routing(&id, date);
            if found.is_none() && id.number != MILEAGE_ROUTING && missing.is_none() {
                *missing = Some(id);
            }
            found
        };

        let mut resolved = Resolved::default();
        resolved.routing = lookup(fare.routing_id(), &mut resolved.missing);

        let (orig, dest) = fare.add_ons();
        if let Some(addon) = orig {
            let id = RoutingId::new(fare.routing_vendor(), fare.carrier.clone(), addon.tariff, addon.routing_number.clone());
            resolved.orig_addon = lookup(id, &mut resolved.missing);
            resolved.orig_gateway = resolved.orig_addon.as_ref().map(|_| addon.gateway.clone());
        }
        if let Some(addon) = dest {
            let id = RoutingId::new(fare.routing_vendor(), fare.carrier.clone(), addon.tariff, addon.routing_number.clone());
            resolved.dest_addon = lookup(id, &mut resolved.missing);
            resolved.dest_gateway = resolved.dest_addon.as_ref().map(|_| addon.gateway.clone());
        }
        resolved
    }

    fn validate_routing(
        &self,
        key: RtgKey,
        fare: &Fare,
        market: &FareMarket,
        route: &TravelRoute,
        resolved: &Resolved,
    ) -> RoutingInfo {
        let mut info = RoutingInfo::new(key);
        info.routing = resolved.routing.as_ref().map(|r| r.id.clone());
        info.orig_addon_routing = resolved.orig_addon.as_ref().map(|r| r.id.clone());
        info.dest_addon_routing = resolved.dest_addon.as_ref().map(|r| r.id.clone());

        if let Some(id) = &resolved.missing {
            tracing::warn!(transaction = %self.ctx.id, routing = %id, "Missing routing data");
            info.failure = Some(RoutingError::DataMissing(id.clone()).to_string());
            info.restrictions_valid = false;
            return info;
        }

        let routing = resolved.routing.as_deref();
        let orig = resolved.orig_addon.as_deref();
        let dest = resolved.dest_addon.as_deref();
        let comps = split_at_gateways(route, resolved.orig_gateway.as_deref(), resolved.dest_gateway.as_deref());

        let outcome = self.check_restrictions(&info.key, fare, route, &comps, resolved);
        info.restrictions_valid = outcome.valid;
        info.restrictions = outcome.infos;
        if !info.restrictions_valid {
            let failed = info.restrictions.iter().find(|r| !r.valid).map_or(0, |r| r.number);
            info.failure = Some(RoutingError::RestrictionFailed(failed).to_string());
        }

        if info.key.involves_mileage() || outcome.mileage_required {
            self.check_mileage(&mut info, market, route);
        }

        if info.restrictions_valid {
            self.check_maps(&mut info, route, &comps, routing, orig, dest);
        }

        tracing::debug!(
            transaction = %self.ctx.id,
            key = %info.key,
            route = %route.route_string(),
            restrictions = info.restrictions_valid,
            map = info.map_valid,
            mileage = info.mileage_valid,
            "Routing validated"
        );
        info
    }

    fn check_restrictions(
        &self,
        key: &RtgKey,
        fare: &Fare,
        route: &TravelRoute,
        comps: &RouteComponents,
        resolved: &Resolved,
    ) -> RestrictionOutcome {
        let ctx = RestrictionContext {
            governing_carrier: &route.governing_carrier,
            rtw: self.ctx.rtw,
            ..RestrictionContext::new(self.data.as_ref(), &key.vendor, &key.carrier)
        };
        let constructed = resolved.is_constructed();
        let routing = resolved.routing.as_deref();
        let orig = resolved.orig_addon.as_deref();
        let dest = resolved.dest_addon.as_deref();

        let base_component = if constructed { Component::Base } else { Component::Whole };
        let mut outcome = RestrictionOutcome::default();
        for (filed, component) in [
            (routing, base_component),
            (orig, Component::OrigAddon),
            (dest, Component::DestAddon),
        ] {
            if let Some(filed) = filed.filter(|r| !r.restrictions.is_empty()) {
                outcome.merge(process_restrictions(&filed.restrictions, route, &ctx, component, constructed));
            }
        }

        if !constructed {
            if let Some(routing) = routing {
                outcome.merge(process_component_restrictions(routing, route, &ctx, Component::Whole, &fare.carrier));
            }
            return outcome;
        }

        let (orig_route, base_route, dest_route) =
            component_routes(route, comps, same_number(orig, routing), same_number(routing, dest));
        if let Some(routing) = routing {
            outcome.merge(process_component_restrictions(routing, &base_route, &ctx, Component::Base, &fare.carrier));
        }
        if let (Some(addon), Some(portion)) = (orig, &orig_route) {
            outcome.merge(process_component_restrictions(addon, portion, &ctx, Component::OrigAddon, &fare.carrier));
        }
        if let (Some(addon), Some(portion)) = (dest, &dest_route) {
            outcome.merge(process_component_restrictions(addon, portion, &ctx, Component::DestAddon, &fare.carrier));
        }
        outcome
    }

    /// Record mileage on `info` without failing the routing.
    fn check_mileage(&self, info: &mut RoutingInfo, market: &FareMarket, route: &TravelRoute) {
        if info.key.involves_mileage() {
            info.is_routing = false;
            if self.ctx.rtw {
                info.mileage_valid = false;
                info.restrictions_valid = false;
                info.failure = Some(RoutingError::MileageNotApplicable("round-the-world fare").to_string());
                return;
            }
        }
        if !info.restrictions_valid {
            return;
        }
        let mileage = self.mileage.validate(route, &market.global_direction, self.data.as_ref());
        info.mileage_valid = mileage.valid;
        if !mileage.valid && info.failure.is_none() {
            info.failure = Some(
                RoutingError::MileageExceeded {
                    tpm: mileage.tpm,
                    mpm: mileage.mpm,
                }
                .to_string(),
            );
        }
        info.mileage_info = Some(mileage);
    }

    fn check_maps(
        &self,
        info: &mut RoutingInfo,
        route: &TravelRoute,
        comps: &RouteComponents,
        routing: Option<&Routing>,
        orig: Option<&Routing>,
        dest: Option<&Routing>,
    ) {
        if !(has_maps(routing) || has_maps(orig) || has_maps(dest)) {
            return;
        }

        let valid = match routing {
            Some(base) if orig.is_none() && dest.is_none() => {
                if base.has_maps() {
                    let (valid, map_info) = self.validate_maps(route, base, None, None);
                    info.map_info = Some(map_info);
                    valid
                } else {
                    true
                }
            }
            Some(base) if base.has_maps() && ((orig.is_some() && !has_maps(orig)) || (dest.is_some() && !has_maps(dest))) => {
                if comps.base.is_empty() {
                    info.map_info = Some(MapInfo {
                        processed: true,
                        valid: true,
                        ..MapInfo::default()
                    });
                    true
                } else {
                    let orig = orig.filter(|r| r.has_maps());
                    let dest = dest.filter(|r| r.has_maps());
                    let (valid, map_info) = self.validate_maps(&comps.base, base, orig, dest);
                    info.map_info = Some(map_info);
                    valid
                }
            }
            Some(base) if base.has_maps() => {
                let (valid, map_info) = self.validate_maps(route, base, orig, dest);
                info.map_info = Some(map_info);
                valid
            }
            _ => {
                let mut valid = true;
                if let (Some(addon), Some(portion)) = (orig.filter(|r| r.has_maps()), &comps.orig_addon) {
                    if !portion.is_empty() {
                        let (ok, map_info) = self.validate_maps(portion, addon, None, None);
                        valid = ok;
                        info.map_info = Some(map_info);
                    }
                }
                if let (Some(addon), Some(portion)) = (dest.filter(|r| r.has_maps()), &comps.dest_addon) {
                    if valid && !portion.is_empty() {
                        let (ok, map_info) = self.validate_maps(portion, addon, None, None);
                        valid = ok;
                        info.addon_map_info = Some(map_info);
                    }
                }
                valid
            }
        };

        info.map_valid = valid;
        if !valid && info.failure.is_none() {
            let map_info = info.addon_map_info.as_ref().or(info.map_info.as_ref());
            info.failure = map_info.map(|m| {
                let mismatch = RoutingError::MapMismatch {
                    missing_city_index: m.missing_city_index,
                    missing_carrier: m.missing_carrier,
                };
                match m.drv_ineligible {
                    Some(reason) => format!("{mismatch}; {}", RoutingError::DrvIneligible(reason)),
                    None => mismatch.to_string(),
                }
            });
        }
    }

    /// Map validation with the DRV fallback.
    fn validate_maps(
        &self,
        route: &TravelRoute,
        routing: &Routing,
        orig: Option<&Routing>,
        dest: Option<&Routing>,
    ) -> (bool, MapInfo) {
        let date = self.ctx.travel_date;
        let mut map_info = MapInfo::default();
        let mut valid = self.validator.validate(route, routing, &mut map_info, date, orig, dest);
        map_info.processed = true;
        map_info.valid = valid;

        if valid {
            return (valid, map_info);
        }
        match self.drv_refusal(route, routing) {
            None => {
                let req = DrvRequest {
                    routing,
                    orig_addon: orig,
                    dest_addon: dest,
                    date,
                };
                valid = self.drv.process(&req, route, &mut map_info);
            }
            Some(reason) => {
                tracing::debug!(routing = %routing.id, reason = %reason, "DRV not applied");
                map_info.drv_ineligible = Some(reason);
            }
        }
        (valid, map_info)
    }

    /// Whether a failed map match may fall back to DRV.
    pub fn drv_allowed(&self, route: &TravelRoute, routing: &Routing) -> bool {
        self.drv_refusal(route, routing).is_none()
    }

    /// Why a failed map match may not fall back to DRV, if it may not.
    pub fn drv_refusal(&self, route: &TravelRoute, routing: &Routing) -> Option<DrvReason> {
        if !self.drv_enabled {
            return Some(DrvReason::Disabled);
        }
        if routing.domestic_validation == DomesticValidation::NotApplicable {
            return Some(DrvReason::RoutingNotApplicable);
        }
        if self.ctx.rtw {
            let area_map = routing
                .maps
                .iter()
                .any(|row| matches!(row.loc_type, MapLocType::Nation | MapLocType::Zone));
            return area_map.then_some(DrvReason::RtwAreaMap);
        }
        match (route.origin(), route.destination()) {
            (Some(origin), Some(destination)) if !same_territory(&origin.nation, &destination.nation) => None,
            _ => Some(DrvReason::DomesticJourney),
        }
    }

    /// The exception pass runs when any fare of the market carries a mileage surcharge.
    fn surcharge_exception_applies<'a>(&self, infos: impl IntoIterator<Item = &'a RoutingInfo>) -> bool {
        if self.ctx.rtw {
            return false;
        }
        infos
            .into_iter()
            .any(|info| info.mileage_info.as_ref().is_some_and(MileageInfo::surcharge_applied))
    }
}

/// Final verdict for a fare once the exception pass has decided mileage.
fn fare_result(fare: &Fare, info: &RoutingInfo, memo_hit: bool, exception: bool) -> FareResult {
    let mut valid = info.provisional_valid();
    let mut pct = 0;
    let mut south_atlantic = false;

    match &info.mileage_info {
        Some(mileage) => {
            let mut mileage_ok = mileage.valid;
            pct = mileage.surcharge_pct;
            if exception && !fare.is_industry() {
                if let Some(alt) = mileage.south_atlantic_pct {
                    pct = alt;
                    mileage_ok = true;
                    south_atlantic = true;
                }
            }
            if !mileage_ok {
                pct = 0;
            }
            valid &= mileage_ok;
        }
        None => valid &= info.mileage_valid,
    }

    FareResult {
        fare_id: fare.id.clone(),
        key: info.key.clone(),
        routing_valid: valid,
        is_routing: info.is_routing,
        surcharge_pct: pct,
        surcharge_amount: surcharge_amount(fare.amount, pct),
        south_atlantic_exception: south_atlantic,
        memo_hit,
        failure: if valid { None } else { info.failure.clone() },
    }
}

impl std::fmt::Debug for RoutingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingController")
            .field("transaction", &self.ctx.id)
            .field("memo_entries", &self.memo.len())
            .field("drv_enabled", &self.drv_enabled)
            .finish()
    }
}
