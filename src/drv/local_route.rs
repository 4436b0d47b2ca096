//! Local and international route construction around a missing city.

use crate::error::DrvReason;
use crate::travel::builder::route_from_segments;
use crate::travel::types::{same_territory, Loc, TravelRoute, TravelSeg};

/// A local route and whether primary sector hidden stops were added to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRoute {
    pub route: TravelRoute,
    pub flight_stop_market: bool,
}

/// Both ends of the segment lie in the missing city's territory.
pub fn is_local(missing: &Loc, seg: &TravelSeg) -> bool {
    same_territory(&seg.board.nation, &missing.nation) && same_territory(&seg.off.nation, &missing.nation)
}

fn check_sector(seg: &TravelSeg, carrier: &str) -> Result<(), DrvReason> {
    if !seg.is_surface() && seg.carrier != carrier {
        return Err(DrvReason::NotSameCarrier);
    }
    Ok(())
}

/// Hidden stops of `primary` inside the missing city's territory, as local sectors.
///
/// `follows_local` is true when the primary sector comes after the local
/// portion; the sectors then start at the primary sector's board point.
fn hidden_stop_sectors(primary: &TravelSeg, missing: &Loc, carrier: &str, follows_local: bool) -> Vec<TravelSeg> {
    if primary.carrier != carrier {
        return Vec::new();
    }
    let stops: Vec<&Loc> = primary
        .hidden_stops
        .iter()
        .filter(|hs| same_territory(&hs.nation, &missing.nation))
        .collect();
    if stops.is_empty() {
        return Vec::new();
    }

    let mut points: Vec<Loc> = Vec::with_capacity(stops.len() + 1);
    if follows_local {
        points.push(primary.board.clone());
        points.extend(stops.into_iter().cloned());
    } else {
        points.extend(stops.into_iter().cloned());
        points.push(primary.off.clone());
    }
    points.dedup_by(|a, b| a.code == b.code);
    points
        .windows(2)
        .map(|w| TravelSeg {
            flight_number: primary.flight_number,
            ..TravelSeg::new(w[0].clone(), carrier, w[1].clone())
        })
        .collect()
}

/// Build the local route around the off point of step `index`.
///
/// The sectors into and out of the missing city seed the route. It grows in
/// both directions while sectors stay in the same territory and on the same
/// carrier, stopping at the primary sector. With flight tracking, the
/// primary sector's hidden stops inside the territory are appended.
pub fn build_local_route(route: &TravelRoute, index: usize, flight_tracking: bool) -> Result<LocalRoute, DrvReason> {
    let segs = &route.segments;
    let step = route.route.get(index).ok_or(DrvReason::MissingCityIndexInvalid)?;
    if index + 1 >= segs.len() {
        return Err(DrvReason::MissingCityOrigDest);
    }
    let missing = &step.off;

    let carrier = if step.is_surface() {
        route.route[index + 1].carrier.clone()
    } else {
        step.carrier.clone()
    };

    for i in [index, index + 1] {
        let seg = &segs[i];
        if !is_local(missing, seg) {
            return Err(DrvReason::NotSameCountry);
        }
        check_sector(seg, &carrier)?;
        if route.primary_sector == Some(i) {
            return Err(DrvReason::MissingCityOrigDest);
        }
    }

    let mut trailing = Vec::new();
    let mut hi = index + 2;
    while hi < segs.len() {
        let seg = &segs[hi];
        if route.primary_sector == Some(hi) {
            if flight_tracking {
                trailing = hidden_stop_sectors(seg, missing, &carrier, true);
            }
            break;
        }
        if !is_local(missing, seg) {
            break;
        }
        check_sector(seg, &carrier)?;
        hi += 1;
    }

    let mut leading = Vec::new();
    let mut lo = index;
    while lo > 0 {
        let seg = &segs[lo - 1];
        if route.primary_sector == Some(lo - 1) {
            if flight_tracking {
                leading = hidden_stop_sectors(seg, missing, &carrier, false);
            }
            break;
        }
        if !is_local(missing, seg) {
            break;
        }
        check_sector(seg, &carrier)?;
        lo -= 1;
    }

    let flight_stop_market = !leading.is_empty() || !trailing.is_empty();
    let mut local = leading;
    local.extend(segs[lo..hi].iter().cloned());
    local.extend(trailing);

    tracing::debug!(
        missing_city = %missing.code,
        carrier = %carrier,
        sectors = local.len(),
        "Built local route"
    );
    Ok(LocalRoute {
        route: route_from_segments(local, carrier, None),
        flight_stop_market,
    })
}

/// The route with each run of local sectors around the missing city collapsed into one.
///
/// The primary sector is always kept as flown.
pub fn build_intl_route(route: &TravelRoute, index: usize) -> Option<TravelRoute> {
    let missing = &route.route.get(index)?.off;
    let mut segments: Vec<TravelSeg> = Vec::with_capacity(route.segments.len());
    let mut primary = None;
    let mut in_local = false;

    for (i, seg) in route.segments.iter().enumerate() {
        if route.primary_sector == Some(i) {
            primary = Some(segments.len());
            segments.push(seg.clone());
            in_local = false;
        } else if !is_local(missing, seg) {
            segments.push(seg.clone());
            in_local = false;
        } else if in_local {
            if let Some(last) = segments.last_mut() {
                last.off = seg.off.clone();
                last.stopover = seg.stopover;
                last.hidden_stops.clear();
            }
        } else {
            segments.push(seg.clone());
            in_local = true;
        }
    }

    if segments.is_empty() {
        return None;
    }
    Some(route_from_segments(segments, route.governing_carrier.clone(), primary))
}
