//! DRV state machine.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::data::DataHandle;
use crate::drv::local_route::{build_intl_route, build_local_route};
use crate::drv::{DrvInfo, DrvStatus};
use crate::error::DrvReason;
use crate::fare::{Fare, FareMarket};
use crate::observability::metrics;
use crate::restrictions::{process_restrictions, Component, RestrictionContext};
use crate::routing::types::{DomesticValidation, Routing};
use crate::routing::validator::{MapInfo, SpecifiedRoutingValidator};
use crate::travel::types::{is_domestic_us_ca, same_territory, TravelRoute};

const AMOUNT_EPSILON: f64 = 0.005;

/// The fare and routings a DRV attempt works for.
#[derive(Debug, Clone, Copy)]
pub struct DrvRequest<'a> {
    pub routing: &'a Routing,
    pub orig_addon: Option<&'a Routing>,
    pub dest_addon: Option<&'a Routing>,
    pub date: NaiveDate,
}

/// Runs domestic routing validation for a failed map match.
#[derive(Clone)]
pub struct DrvController {
    data: Arc<dyn DataHandle>,
    validator: SpecifiedRoutingValidator,
}

impl DrvController {
    pub fn new(data: Arc<dyn DataHandle>, validator: SpecifiedRoutingValidator) -> Self {
        Self { data, validator }
    }

    /// Try DRV for the missing city recorded on `map_info`.
    ///
    /// Records every attempt on `map_info.drv_infos` and the overall result
    /// on `map_info.drv_status`. Returns whether the route is now valid.
    pub fn process(&self, req: &DrvRequest<'_>, route: &TravelRoute, map_info: &mut MapInfo) -> bool {
        let origin_nation = route.origin().map(|o| o.nation.clone()).unwrap_or_default();
        let mut infos = Vec::new();
        let mut tried: BTreeSet<String> = BTreeSet::new();
        let mut current = route.clone();
        let mut index = map_info.missing_city_index;
        let mut valid = false;

        for attempt in 0..2 {
            let info = self.perform_drv(req, &current, index);
            let passed = info.valid;
            tried.insert(info.missing_city.clone());
            infos.push(info);
            metrics::record_drv_attempt(passed);
            if !passed {
                valid = false;
                break;
            }

            let Some(intl) = usize::try_from(index).ok().and_then(|i| build_intl_route(&current, i)) else {
                valid = false;
                break;
            };
            let mut intl_info = MapInfo::default();
            valid = self.validator.validate(
                &intl,
                req.routing,
                &mut intl_info,
                req.date,
                req.orig_addon,
                req.dest_addon,
            );
            map_info.post_drv_missing_index = intl_info.missing_city_index;
            if valid || attempt == 1 {
                break;
            }

            let next = intl_info.missing_city_index;
            let Some(city) = usize::try_from(next).ok().and_then(|i| intl.route.get(i)).map(|cc| cc.off.clone()) else {
                break;
            };
            // A city newly missing in the origin country is not retried.
            if same_territory(&city.nation, &origin_nation) || tried.contains(&city.code) {
                infos.push(
                    DrvInfo {
                        missing_city: city.code,
                        ..DrvInfo::default()
                    }
                    .failed(DrvReason::AlreadyChecked),
                );
                break;
            }
            current = intl;
            index = next;
        }

        map_info.drv_status = if valid { DrvStatus::Passed } else { DrvStatus::Failed };
        map_info.drv_infos = infos;
        tracing::debug!(
            routing = %req.routing.id,
            route = %route.route_string(),
            valid,
            "DRV complete"
        );
        valid
    }

    /// One DRV attempt for the off point of step `index`.
    pub fn perform_drv(&self, req: &DrvRequest<'_>, route: &TravelRoute, index: i32) -> DrvInfo {
        let info = DrvInfo::default();
        let Some(step) = usize::try_from(index).ok().filter(|i| *i < route.len()) else {
            return info.failed(DrvReason::MissingCityIndexInvalid);
        };
        let mut info = DrvInfo {
            missing_city: route.route[step].off.code.clone(),
            ..info
        };

        // Carrier preference refusals are reported as NotSameCountry too.
        if !self.carrier_allows_drv(route, step, req.date) {
            return info.failed(DrvReason::NotSameCountry);
        }

        let tracking = self
            .data
            .carrier_preference_or_default(&route.route[step].carrier, req.date)
            .flight_tracking;
        let local = match build_local_route(route, step, tracking) {
            Ok(local) => local,
            Err(reason) => return info.failed(reason),
        };
        info.local_route = local.route.route_string();
        info.local_governing_carrier = local.route.governing_carrier.clone();
        info.flight_stop_market = local.flight_stop_market;

        if req.routing.domestic_validation == DomesticValidation::PassAnyOnlinePoint {
            info.valid = true;
            return info;
        }

        let (Some(origin), Some(destination)) = (local.route.origin(), local.route.destination()) else {
            return info.failed(DrvReason::NoFareMarket);
        };
        let Some(market) = self
            .data
            .local_fare_market(&origin.code, &destination.code, &local.route.governing_carrier)
        else {
            return info.failed(DrvReason::NoFareMarket);
        };

        let candidates = select_fares(&market);
        if candidates.is_empty() {
            return info.failed(DrvReason::NoPaxTypeFares);
        }

        for fare in candidates {
            info.fare_id = Some(fare.id.clone());
            info.fare_amount = fare.amount;
            let Some(local_routing) = self.data.get_routing(&fare.routing_id(), req.date) else {
                info.failure = Some(DrvReason::GetRoutingFailed);
                continue;
            };
            info.failure = None;
            info.routing = Some(local_routing.id.clone());
            if self.validate_local(&local.route, &local_routing, req.date, &mut info) {
                info.valid = true;
                tracing::debug!(missing_city = %info.missing_city, fare = %fare.id, "Local routing valid");
                return info;
            }
        }
        if let Some(reason) = info.failure {
            return info.failed(reason);
        }
        info
    }

    /// Whether DRV may look at the missing city at all.
    ///
    /// Always inside US/CA territory when the journey starts or ends there.
    /// Elsewhere only in the origin or destination nation, and only if the
    /// carrier's preference allows it.
    pub fn carrier_allows_drv(&self, route: &TravelRoute, index: usize, date: NaiveDate) -> bool {
        let (Some(origin), Some(destination), Some(step)) = (route.origin(), route.destination(), route.route.get(index))
        else {
            return false;
        };
        let city = &step.off;
        if is_domestic_us_ca(&city.nation) {
            return is_domestic_us_ca(&origin.nation) || is_domestic_us_ca(&destination.nation);
        }
        (city.nation == origin.nation || city.nation == destination.nation)
            && self
                .data
                .carrier_preference_or_default(&route.governing_carrier, date)
                .drv_outside_domestic
    }

    fn validate_local(&self, route: &TravelRoute, routing: &Routing, date: NaiveDate, info: &mut DrvInfo) -> bool {
        if routing.has_maps() {
            let mut map_info = MapInfo::default();
            let valid = self.validator.validate(route, routing, &mut map_info, date, None, None);
            map_info.processed = true;
            map_info.valid = valid;
            map_info.drv_status = if valid { DrvStatus::Passed } else { DrvStatus::Failed };
            info.map_info = Some(map_info);
            valid
        } else {
            let ctx = RestrictionContext::new(self.data.as_ref(), &routing.id.vendor, &routing.id.carrier);
            let outcome = process_restrictions(&routing.restrictions, route, &ctx, Component::Whole, false);
            info.restrictions = outcome.infos;
            outcome.valid
        }
    }
}

/// Published public fares tied for the highest amount, highest first.
pub fn select_fares(market: &FareMarket) -> Vec<&Fare> {
    let mut qualifying: Vec<&Fare> = market.fares.iter().filter(|f| f.qualifies_for_drv()).collect();
    qualifying.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    let Some(highest) = qualifying.first().map(|f| f.amount) else {
        return qualifying;
    };
    qualifying.retain(|f| f.amount >= highest - AMOUNT_EPSILON);
    qualifying
}

impl std::fmt::Debug for DrvController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrvController").field("validator", &self.validator).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CarrierPreference, InMemoryDataHandle};
    use crate::fare::FareKind;
    use crate::routing::cache::GraphCache;
    use crate::routing::types::{MapLocType, MapTag, RoutingId, RoutingMapRow};
    use crate::travel::builder::route_from_segments;
    use crate::travel::types::{Loc, TravelSeg};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    fn seg(b: (&str, &str), c: &str, o: (&str, &str)) -> TravelSeg {
        TravelSeg::new(Loc::new(b.0, b.1), c, Loc::new(o.0, o.1))
    }

    fn dfw_lon() -> TravelRoute {
        route_from_segments(
            vec![
                seg(("DFW", "US"), "AA", ("NYC", "US")),
                seg(("NYC", "US"), "AA", ("CHI", "US")),
                seg(("CHI", "US"), "AA", ("ATL", "US")),
                seg(("ATL", "US"), "BA", ("LON", "GB")),
            ],
            "BA",
            Some(3),
        )
    }

    /// DFW-AA-NYC-AA-ATL-BA-LON, without CHI.
    fn intl_routing() -> Routing {
        Routing::new(RoutingId::new("ATP", "BA", 4, "0100"))
            .with_map(RoutingMapRow::new(1, MapTag::Entry, 2, 0, MapLocType::City, "DFW"))
            .with_map(RoutingMapRow::new(2, MapTag::Connect, 3, 0, MapLocType::Airline, "AA"))
            .with_map(RoutingMapRow::new(3, MapTag::Connect, 4, 0, MapLocType::City, "NYC"))
            .with_map(RoutingMapRow::new(4, MapTag::Connect, 5, 0, MapLocType::Airline, "AA"))
            .with_map(RoutingMapRow::new(5, MapTag::Connect, 6, 0, MapLocType::City, "ATL"))
            .with_map(RoutingMapRow::new(6, MapTag::Connect, 7, 0, MapLocType::Airline, "BA"))
            .with_map(RoutingMapRow::new(7, MapTag::Exit, 0, 0, MapLocType::City, "LON"))
    }

    fn local_market(fares: Vec<Fare>) -> FareMarket {
        FareMarket {
            id: "DFW-ATL".to_string(),
            origin: Loc::new("DFW", "US"),
            destination: Loc::new("ATL", "US"),
            governing_carrier: "AA".to_string(),
            segments: Vec::new(),
            primary_sector: None,
            global_direction: "WH".to_string(),
            fares,
        }
    }

    fn controller(data: InMemoryDataHandle) -> DrvController {
        let data: Arc<dyn DataHandle> = Arc::new(data);
        let validator = SpecifiedRoutingValidator::new(data.clone(), GraphCache::new(64));
        DrvController::new(data, validator)
    }

    #[test]
    fn test_carrier_allows_drv() {
        let drv = controller(InMemoryDataHandle::new());
        assert!(drv.carrier_allows_drv(&dfw_lon(), 1, date()));

        let europe = route_from_segments(
            vec![
                seg(("NYC", "US"), "BA", ("LON", "GB")),
                seg(("LON", "GB"), "BA", ("MAN", "GB")),
                seg(("MAN", "GB"), "BA", ("EDI", "GB")),
            ],
            "BA",
            Some(0),
        );
        assert!(!drv.carrier_allows_drv(&europe, 1, date()));

        let mut data = InMemoryDataHandle::new();
        data.add_carrier_preference(CarrierPreference {
            carrier: "BA".to_string(),
            flight_tracking: false,
            drv_outside_domestic: true,
        });
        assert!(controller(data).carrier_allows_drv(&europe, 1, date()));
    }

    #[test]
    fn test_select_fares_highest_qualifying() {
        let mut private = Fare::new("p", "ATP", "AA", 1, "0001", 900.0);
        private.private_tariff = true;
        let market = local_market(vec![
            Fare::new("low", "ATP", "AA", 1, "0001", 100.0),
            private,
            Fare::new("high", "ATP", "AA", 1, "0002", 300.0),
            Fare::new("tie", "ATP", "AA", 1, "0003", 300.0),
            Fare::new("fbr", "ATP", "AA", 1, "0004", 500.0).with_kind(FareKind::FareByRule { base_vendor: None }),
        ]);
        let ids: Vec<&str> = select_fares(&market).iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["high", "tie"]);
    }

    #[test]
    fn test_drv_passes_on_local_restrictions() {
        let mut data = InMemoryDataHandle::new();
        data.add_fare_market(local_market(vec![Fare::new("y", "ATP", "AA", 1, "0001", 300.0)]));
        data.add_routing(Routing::new(RoutingId::new("ATP", "AA", 1, "0001")));
        let drv = controller(data);

        let routing = intl_routing();
        let req = DrvRequest {
            routing: &routing,
            orig_addon: None,
            dest_addon: None,
            date: date(),
        };
        let mut map_info = MapInfo {
            processed: true,
            missing_city_index: 1,
            ..MapInfo::default()
        };
        assert!(drv.process(&req, &dfw_lon(), &mut map_info));
        assert_eq!(map_info.drv_status, DrvStatus::Passed);
        assert_eq!(map_info.drv_infos.len(), 1);
        assert_eq!(map_info.drv_infos[0].local_route, "DFW-AA-NYC-AA-CHI-AA-ATL");
        assert_eq!(map_info.post_drv_missing_index, -1);
    }

    #[test]
    fn test_drv_failure_reasons() {
        let routing = intl_routing();
        let req = DrvRequest {
            routing: &routing,
            orig_addon: None,
            dest_addon: None,
            date: date(),
        };
        let drv = controller(InMemoryDataHandle::new());
        assert_eq!(
            drv.perform_drv(&req, &dfw_lon(), -1).failure,
            Some(DrvReason::MissingCityIndexInvalid)
        );
        assert_eq!(drv.perform_drv(&req, &dfw_lon(), 1).failure, Some(DrvReason::NoFareMarket));

        let mut data = InMemoryDataHandle::new();
        data.add_fare_market(local_market(Vec::new()));
        let drv = controller(data);
        assert_eq!(drv.perform_drv(&req, &dfw_lon(), 1).failure, Some(DrvReason::NoPaxTypeFares));

        let mut data = InMemoryDataHandle::new();
        data.add_fare_market(local_market(vec![Fare::new("y", "ATP", "AA", 1, "0009", 300.0)]));
        let drv = controller(data);
        assert_eq!(drv.perform_drv(&req, &dfw_lon(), 1).failure, Some(DrvReason::GetRoutingFailed));

        let mut online = intl_routing();
        online.domestic_validation = DomesticValidation::PassAnyOnlinePoint;
        let req = DrvRequest {
            routing: &online,
            ..req
        };
        assert!(controller(InMemoryDataHandle::new()).perform_drv(&req, &dfw_lon(), 1).valid);
    }

    /// BA map DFW-AA-NYC-AA-ATL-BA-LON-BA-EDI, without CHI or MAN.
    fn edi_routing() -> Routing {
        Routing::new(RoutingId::new("ATP", "BA", 4, "0300"))
            .with_map(RoutingMapRow::new(1, MapTag::Entry, 2, 0, MapLocType::City, "DFW"))
            .with_map(RoutingMapRow::new(2, MapTag::Connect, 3, 0, MapLocType::Airline, "AA"))
            .with_map(RoutingMapRow::new(3, MapTag::Connect, 4, 0, MapLocType::City, "NYC"))
            .with_map(RoutingMapRow::new(4, MapTag::Connect, 5, 0, MapLocType::Airline, "AA"))
            .with_map(RoutingMapRow::new(5, MapTag::Connect, 6, 0, MapLocType::City, "ATL"))
            .with_map(RoutingMapRow::new(6, MapTag::Connect, 7, 0, MapLocType::Airline, "BA"))
            .with_map(RoutingMapRow::new(7, MapTag::Connect, 8, 0, MapLocType::City, "LON"))
            .with_map(RoutingMapRow::new(8, MapTag::Exit, 0, 0, MapLocType::City, "EDI"))
    }

    /// Local markets DFW-ATL on AA and LON-EDI on BA, BA allowing DRV abroad.
    fn edi_data() -> InMemoryDataHandle {
        let mut data = InMemoryDataHandle::new();
        data.add_fare_market(local_market(vec![Fare::new("y", "ATP", "AA", 1, "0001", 300.0)]));
        data.add_routing(Routing::new(RoutingId::new("ATP", "AA", 1, "0001")));
        data.add_fare_market(FareMarket {
            id: "LON-EDI".to_string(),
            origin: Loc::new("LON", "GB"),
            destination: Loc::new("EDI", "GB"),
            governing_carrier: "BA".to_string(),
            segments: Vec::new(),
            primary_sector: None,
            global_direction: "EH".to_string(),
            fares: vec![Fare::new("m", "ATP", "BA", 1, "0002", 120.0)],
        });
        data.add_routing(Routing::new(RoutingId::new("ATP", "BA", 1, "0002")));
        data.add_carrier_preference(CarrierPreference {
            carrier: "BA".to_string(),
            flight_tracking: false,
            drv_outside_domestic: true,
        });
        data
    }

    fn dfw_edi(via_nyc: bool) -> TravelRoute {
        let mut segments = Vec::new();
        if via_nyc {
            segments.push(seg(("DFW", "US"), "AA", ("NYC", "US")));
            segments.push(seg(("NYC", "US"), "AA", ("CHI", "US")));
        } else {
            segments.push(seg(("DFW", "US"), "AA", ("CHI", "US")));
        }
        segments.extend([
            seg(("CHI", "US"), "AA", ("ATL", "US")),
            seg(("ATL", "US"), "BA", ("LON", "GB")),
            seg(("LON", "GB"), "BA", ("MAN", "GB")),
            seg(("MAN", "GB"), "BA", ("EDI", "GB")),
        ]);
        let primary = segments.len() - 3;
        route_from_segments(segments, "BA", Some(primary))
    }

    #[test]
    fn test_drv_retries_city_outside_origin_country() {
        let drv = controller(edi_data());
        let routing = edi_routing();
        let req = DrvRequest {
            routing: &routing,
            orig_addon: None,
            dest_addon: None,
            date: date(),
        };
        let mut map_info = MapInfo {
            processed: true,
            missing_city_index: 1,
            ..MapInfo::default()
        };
        assert!(drv.process(&req, &dfw_edi(true), &mut map_info));
        assert_eq!(map_info.drv_status, DrvStatus::Passed);
        let cities: Vec<&str> = map_info.drv_infos.iter().map(|i| i.missing_city.as_str()).collect();
        assert_eq!(cities, ["CHI", "MAN"]);
        assert_eq!(map_info.drv_infos[1].local_route, "LON-BA-MAN-BA-EDI");
        assert_eq!(map_info.post_drv_missing_index, -1);
    }

    #[test]
    fn test_drv_does_not_repeat_in_origin_country() {
        let drv = controller(edi_data());
        let routing = edi_routing();
        let req = DrvRequest {
            routing: &routing,
            orig_addon: None,
            dest_addon: None,
            date: date(),
        };
        // MAN first; once LON-MAN-EDI collapses, CHI in the origin country is missing.
        let mut map_info = MapInfo {
            processed: true,
            missing_city_index: 3,
            ..MapInfo::default()
        };
        assert!(!drv.process(&req, &dfw_edi(false), &mut map_info));
        assert_eq!(map_info.drv_status, DrvStatus::Failed);
        assert_eq!(map_info.drv_infos.len(), 2);
        assert!(map_info.drv_infos[0].valid);
        assert_eq!(map_info.drv_infos[0].missing_city, "MAN");
        assert_eq!(map_info.drv_infos[1].missing_city, "CHI");
        assert_eq!(map_info.drv_infos[1].failure, Some(DrvReason::AlreadyChecked));
    }

    #[test]
    fn test_drv_retry_needs_carrier_preference() {
        let mut data = InMemoryDataHandle::new();
        data.add_fare_market(local_market(vec![Fare::new("y", "ATP", "AA", 1, "0001", 300.0)]));
        data.add_routing(Routing::new(RoutingId::new("ATP", "AA", 1, "0001")));
        let drv = controller(data);

        // LON is not on this map: the international route still fails after DRV.
        let routing = Routing::new(RoutingId::new("ATP", "BA", 4, "0200"))
            .with_map(RoutingMapRow::new(1, MapTag::Entry, 2, 0, MapLocType::City, "DFW"))
            .with_map(RoutingMapRow::new(2, MapTag::Connect, 3, 0, MapLocType::Airline, "AA"))
            .with_map(RoutingMapRow::new(3, MapTag::Exit, 0, 0, MapLocType::City, "ATL"));
        let req = DrvRequest {
            routing: &routing,
            orig_addon: None,
            dest_addon: None,
            date: date(),
        };
        let mut map_info = MapInfo {
            processed: true,
            missing_city_index: 1,
            ..MapInfo::default()
        };
        assert!(!drv.process(&req, &dfw_lon(), &mut map_info));
        assert_eq!(map_info.drv_status, DrvStatus::Failed);
        assert_eq!(map_info.drv_infos.len(), 2);
        assert!(map_info.drv_infos[0].valid);
        assert_eq!(map_info.drv_infos[1].missing_city, "LON");
        assert_eq!(map_info.drv_infos[1].failure, Some(DrvReason::NotSameCountry));
    }
}
