//! Restriction combination for one routing component.
//!
//! # Responsibilities
//! - Apply the exclusion rule (12 and 17 always, 3 for constructed fares)
//! - OR positive duplicates sharing a restriction key
//! - AND duplicate restriction-2 rows once any is filed blank or not permitted
//! - Keep restriction 16 provisional and flag that mileage must be validated
//! - Validate 3, 12 and 17 per component against the component's own route
//!
//! # Design Decisions
//! - Verdicts are accumulated per key in a `BTreeMap` so the final pass is one scan
//! - Unknown restriction numbers pass with a debug log

use std::collections::{BTreeMap, BTreeSet};

use crate::restrictions::carrier_list::carriers_listed;
use crate::restrictions::rtw::validate_nonstop_groups;
use crate::restrictions::{is_positive_number, validator_for, Component, RestrictionContext, RestrictionInfo};
use crate::routing::types::{Routing, RoutingRestriction, ViaAppl, INDUSTRY_CARRIER};
use crate::travel::types::TravelRoute;

/// Identity under which duplicate rows are combined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RestrictionKey {
    pub number: u8,
    pub market1: String,
    pub market2: String,
}

impl RestrictionKey {
    /// With `check_flip`, rows filed as m1/m2 and m2/m1 share a key.
    pub fn new(number: u8, market1: &str, market2: &str, check_flip: bool) -> Self {
        let (market1, market2) = if check_flip && market2 < market1 {
            (market2, market1)
        } else {
            (market1, market2)
        };
        Self {
            number,
            market1: market1.to_string(),
            market2: market2.to_string(),
        }
    }
}

/// Combined verdict of a component's restrictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionOutcome {
    pub valid: bool,
    pub infos: Vec<RestrictionInfo>,
    /// Restriction 16 was filed: mileage must be validated as well.
    pub mileage_required: bool,
}

impl Default for RestrictionOutcome {
    fn default() -> Self {
        Self {
            valid: true,
            infos: Vec::new(),
            mileage_required: false,
        }
    }
}

impl RestrictionOutcome {
    /// AND another component's outcome into this one.
    pub fn merge(&mut self, other: RestrictionOutcome) {
        self.valid &= other.valid;
        self.mileage_required |= other.mileage_required;
        self.infos.extend(other.infos);
    }
}

/// Rows handled per component instead of by ordinary dispatch.
fn is_excluded(number: u8, constructed: bool) -> bool {
    matches!(number, 12 | 17) || (constructed && number == 3)
}

/// Duplicate restriction-2 rows are ANDed once any of them is filed blank or not permitted.
fn uses_and_logic<'a>(rows: impl IntoIterator<Item = &'a RoutingRestriction>) -> bool {
    rows.into_iter().any(|r| r.number == 2 && !r.appl.is_positive())
}

fn validate_row(route: &TravelRoute, row: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
    match validator_for(row.number) {
        Some(validator) => validator.validate(route, row, ctx),
        None => {
            tracing::debug!(restriction = row.number, "Unknown restriction number, passing");
            true
        }
    }
}

/// Validate the ordinary restrictions of one component.
pub fn process_restrictions(
    rows: &[RoutingRestriction],
    route: &TravelRoute,
    ctx: &RestrictionContext<'_>,
    component: Component,
    constructed: bool,
) -> RestrictionOutcome {
    let rows: Vec<&RoutingRestriction> = rows.iter().filter(|r| !is_excluded(r.number, constructed)).collect();
    let use_and = uses_and_logic(rows.iter().copied());

    let mut outcome = RestrictionOutcome::default();
    let mut verdicts: BTreeMap<RestrictionKey, bool> = BTreeMap::new();

    for row in rows {
        let key = RestrictionKey::new(row.number, &row.market1, &row.market2, use_and);
        let positive = is_positive_number(row.number) && row.appl.is_positive() && !(use_and && row.number == 2);

        if positive {
            let info = match verdicts.get(&key).copied() {
                Some(true) => RestrictionInfo {
                    processed: false,
                    ..RestrictionInfo::new(row.number, component, true)
                },
                seen => {
                    let valid = validate_row(route, row, ctx);
                    if seen.is_none() || valid {
                        verdicts.insert(key, valid);
                    }
                    RestrictionInfo::new(row.number, component, valid)
                }
            };
            outcome.infos.push(info);
            continue;
        }

        let valid = validate_row(route, row, ctx);
        outcome.infos.push(RestrictionInfo::new(row.number, component, valid));
        if row.number == 16 {
            outcome.mileage_required = true;
            verdicts.entry(key).or_insert(true);
        } else {
            verdicts.entry(key).or_insert(valid);
            if !valid {
                tracing::debug!(restriction = row.number, ?component, "Restriction failed");
                outcome.valid = false;
            }
        }
    }

    if outcome.valid {
        outcome.valid = verdicts.values().all(|v| *v);
    }
    outcome
}

/// Validate restrictions 3, 12 and 17 of one routing against its component's route.
///
/// 3 is checked here only for components of a constructed fare. 17 applies to
/// components, or to a whole route whose routing has no map and is not an
/// industry fare. 12 applies to round-the-world journeys.
pub fn process_component_restrictions(
    routing: &Routing,
    route: &TravelRoute,
    ctx: &RestrictionContext<'_>,
    component: Component,
    fare_carrier: &str,
) -> RestrictionOutcome {
    let mut outcome = RestrictionOutcome::default();
    if routing.restrictions.is_empty() || route.is_empty() {
        return outcome;
    }

    let process17 = component != Component::Whole || (!routing.has_maps() && fare_carrier != INDUSTRY_CARRIER);
    let mut carriers: BTreeSet<&str> = BTreeSet::new();
    let mut list17: Vec<&RoutingRestriction> = Vec::new();
    let mut list12: Vec<&RoutingRestriction> = Vec::new();

    for row in &routing.restrictions {
        match row.number {
            3 if component != Component::Whole
                && matches!(row.appl, ViaAppl::Required | ViaAppl::NotPermitted) =>
            {
                let valid = validate_row(route, row, ctx);
                outcome.infos.push(RestrictionInfo::new(3, component, valid));
                outcome.valid &= valid;
            }
            17 if process17 && row.appl == ViaAppl::Blank => {
                carriers.insert(row.via_carrier.as_str());
                list17.push(row);
            }
            12 if ctx.rtw => list12.push(row),
            _ => {}
        }
    }

    if outcome.valid && !list12.is_empty() {
        let infos = validate_nonstop_groups(route, &list12, ctx, component);
        outcome.valid &= infos.iter().all(|i| i.valid);
        outcome.infos.extend(infos);
    }

    if outcome.valid && !carriers.is_empty() {
        let valid = carriers_listed(route, &carriers, ctx);
        outcome.valid &= valid;
        outcome.infos.extend(
            list17
                .iter()
                .map(|row| RestrictionInfo::new(17, component, valid).with_detail(row.via_carrier.clone())),
        );
    }
    outcome
}
