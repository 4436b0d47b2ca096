//! Round-the-world restrictions: 8 (filed MPM) and 12 (nonstop sectors per nation pair).

use std::collections::{BTreeMap, BTreeSet};

use crate::restrictions::{Component, RestrictionContext, RestrictionInfo, RestrictionValidator};
use crate::routing::types::{LocType, RoutingRestriction};
use crate::travel::types::{Loc, TravelRoute};

/// 8: total TPM of the journey must not exceed the MPM filed on the row.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtwMileageRestrictionValidator;

impl RestrictionValidator for RtwMileageRestrictionValidator {
    fn validate(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        if r.mpm == 0 {
            return true;
        }
        let mut total = 0u32;
        for cc in &route.route {
            match ctx.data.tpm(&cc.board.code, &cc.off.code) {
                Some(miles) => total += miles,
                None => {
                    tracing::warn!(from = %cc.board.code, to = %cc.off.code, "No TPM for sector");
                    return false;
                }
            }
        }
        tracing::trace!(total, mpm = r.mpm, "RTW mileage");
        total <= r.mpm
    }
}

/// Nation codes treated as one for grouping.
fn normalize_nation(nation: &str) -> &str {
    match nation {
        "XU" => "RU",
        "CA" => "US",
        other => other,
    }
}

/// Nation a market stands for. Cities resolve through the data handle.
fn market_nation(ctx: &RestrictionContext<'_>, market: &str, loc_type: LocType) -> String {
    match loc_type {
        LocType::City => match ctx.data.city_nation(market) {
            Some(nation) => normalize_nation(&nation).to_string(),
            None => {
                tracing::debug!(city = %market, "No nation for city, grouping by city code");
                market.to_string()
            }
        },
        LocType::Nation => normalize_nation(market).to_string(),
        LocType::Zone => market.to_string(),
    }
}

type Market<'a> = (LocType, &'a str);

/// Markets of one nation-pair group, split by which nation of the pair they stand for.
#[derive(Debug, Default)]
struct Group<'a> {
    first: BTreeSet<Market<'a>>,
    second: BTreeSet<Market<'a>>,
}

/// Ordered nation pair of a row, and whether the row is filed in that order.
fn group_key(ctx: &RestrictionContext<'_>, row: &RoutingRestriction) -> ((String, String), bool) {
    let a = market_nation(ctx, &row.market1, row.market1_type);
    let b = market_nation(ctx, &row.market2, row.market2_type);
    if a <= b {
        ((a, b), true)
    } else {
        ((b, a), false)
    }
}

/// 12: at most one nonstop single-coupon sector per nation-pair group.
///
/// Rows are grouped by the ordered pair of their markets' nations. Every
/// nonstop flown coupon between any market of the group's first nation and
/// any market of its second nation counts against the group. One
/// `RestrictionInfo` per row, carrying its group's verdict.
pub fn validate_nonstop_groups(
    route: &TravelRoute,
    rows: &[&RoutingRestriction],
    ctx: &RestrictionContext<'_>,
    component: Component,
) -> Vec<RestrictionInfo> {
    let keys: Vec<((String, String), bool)> = rows.iter().map(|row| group_key(ctx, row)).collect();

    let mut groups: BTreeMap<&(String, String), Group<'_>> = BTreeMap::new();
    for (row, (key, in_order)) in rows.iter().zip(&keys) {
        let m1 = (row.market1_type, row.market1.as_str());
        let m2 = (row.market2_type, row.market2.as_str());
        let (first, second) = if *in_order { (m1, m2) } else { (m2, m1) };
        let group = groups.entry(key).or_default();
        group.first.insert(first);
        group.second.insert(second);
    }

    let matches = |loc: &Loc, markets: &BTreeSet<Market<'_>>| {
        markets
            .iter()
            .any(|&(loc_type, market)| ctx.loc_matches(loc, market, loc_type))
    };

    let mut verdicts: BTreeMap<&(String, String), bool> = BTreeMap::new();
    for (key, group) in &groups {
        let nonstops = route
            .segments
            .iter()
            .filter(|seg| !seg.is_surface() && seg.is_nonstop())
            .filter(|seg| {
                (matches(&seg.board, &group.first) && matches(&seg.off, &group.second))
                    || (matches(&seg.board, &group.second) && matches(&seg.off, &group.first))
            })
            .count();
        if nonstops >= 2 {
            tracing::debug!(from = %key.0, to = %key.1, nonstops, "Restriction 12 group failed");
        }
        verdicts.insert(*key, nonstops < 2);
    }

    keys.iter()
        .map(|(key, _)| {
            let valid = verdicts.get(key).copied().unwrap_or(true);
            RestrictionInfo::new(12, component, valid).with_detail(format!("{}-{}", key.0, key.1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryDataHandle;
    use crate::restrictions::testing::route_in;
    use crate::routing::types::ViaAppl;

    fn nation(city: &str) -> &'static str {
        match city {
            "LON" | "MAN" => "GB",
            "YTO" => "CA",
            "MOW" => "RU",
            "LED" => "XU",
            _ => "US",
        }
    }

    #[test]
    fn test_rtw_mileage() {
        let mut data = InMemoryDataHandle::new();
        data.add_tpm("NYC", "LON", 3458);
        data.add_tpm("LON", "MAN", 162);
        let ctx = RestrictionContext::new(&data, "ATP", "AA");
        let trip = route_in(&["NYC", "AA", "LON", "BA", "MAN"], nation);
        let v = RtwMileageRestrictionValidator;

        let mut row = RoutingRestriction::new(8, ViaAppl::Required);
        row.mpm = 3700;
        assert!(v.validate(&trip, &row, &ctx));
        row.mpm = 3500;
        assert!(!v.validate(&trip, &row, &ctx));

        let unknown = route_in(&["NYC", "AA", "PAR"], nation);
        assert!(!v.validate(&unknown, &row, &ctx));
    }

    #[test]
    fn test_nonstop_groups() {
        let data = InMemoryDataHandle::new();
        let ctx = RestrictionContext::new(&data, "ATP", "AA");
        let rows = [
            RoutingRestriction::new(12, ViaAppl::Blank).between("US", "GB"),
            RoutingRestriction::new(12, ViaAppl::Blank).between("CA", "GB"),
        ];
        let rows: Vec<_> = rows
            .iter()
            .map(|r| RoutingRestriction {
                market1_type: LocType::Nation,
                market2_type: LocType::Nation,
                ..r.clone()
            })
            .collect();
        let refs: Vec<&RoutingRestriction> = rows.iter().collect();

        let once = route_in(&["NYC", "AA", "LON", "BA", "MAN"], nation);
        let infos = validate_nonstop_groups(&once, &refs, &ctx, Component::Whole);
        assert!(infos.iter().all(|i| i.valid));

        let twice = route_in(&["NYC", "AA", "LON", "AC", "YTO"], nation);
        let infos = validate_nonstop_groups(&twice, &refs, &ctx, Component::Whole);
        assert_eq!(infos.len(), 2);
        assert!(infos.iter().all(|i| !i.valid));
        assert_eq!(infos[0].detail, "GB-US");
    }

    fn city_data() -> InMemoryDataHandle {
        let mut data = InMemoryDataHandle::new();
        for city in ["NYC", "CHI", "LON", "MAN"] {
            data.add_city(city, nation(city));
        }
        data
    }

    #[test]
    fn test_nonstop_groups_span_rows() {
        let data = city_data();
        let ctx = RestrictionContext::new(&data, "ATP", "AA");
        let rows = [
            RoutingRestriction::new(12, ViaAppl::Blank).between("NYC", "LON"),
            RoutingRestriction::new(12, ViaAppl::Blank).between("CHI", "MAN"),
        ];
        let refs: Vec<&RoutingRestriction> = rows.iter().collect();

        // CHI-LON and NYC-MAN each pair markets filed on different rows.
        let crossed = route_in(&["CHI", "AA", "LON", "XX", "NYC", "BA", "MAN"], nation);
        let infos = validate_nonstop_groups(&crossed, &refs, &ctx, Component::Whole);
        assert_eq!(infos.len(), 2);
        assert!(infos.iter().all(|i| !i.valid));
        assert!(infos.iter().all(|i| i.detail == "GB-US"));

        let single = route_in(&["CHI", "AA", "LON", "XX", "MAN"], nation);
        let infos = validate_nonstop_groups(&single, &refs, &ctx, Component::Whole);
        assert!(infos.iter().all(|i| i.valid));
    }

    #[test]
    fn test_city_market_nation_ignores_route() {
        let data = city_data();
        let ctx = RestrictionContext::new(&data, "ATP", "AA");
        let rows = [
            RoutingRestriction::new(12, ViaAppl::Blank).between("NYC", "LON"),
            RoutingRestriction::new(12, ViaAppl::Blank).between("CHI", "MAN"),
        ];
        let refs: Vec<&RoutingRestriction> = rows.iter().collect();

        // Neither CHI nor MAN is flown, yet both rows still share the GB-US group.
        let trip = route_in(&["NYC", "AA", "LON"], nation);
        let infos = validate_nonstop_groups(&trip, &refs, &ctx, Component::Whole);
        assert!(infos.iter().all(|i| i.valid && i.detail == "GB-US"));

        assert_eq!(market_nation(&ctx, "CHI", LocType::City), "US");
        assert_eq!(market_nation(&ctx, "YTO", LocType::City), "YTO");
        assert_eq!(market_nation(&ctx, "CA", LocType::Nation), "US");
    }

    #[test]
    fn test_nation_normalization() {
        assert_eq!(normalize_nation("XU"), "RU");
        assert_eq!(normalize_nation("CA"), "US");
        assert_eq!(normalize_nation("GB"), "GB");
    }
}
