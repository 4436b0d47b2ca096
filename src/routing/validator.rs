//! Specified routing validation across orientation and add-on variants.
//!
//! # Responsibilities
//! - Resolve the compiled graphs of a routing and its add-ons
//! - Try each attempt variant in order until one matches
//! - Report the closest-to-destination failure when none does
//!
//! # Design Decisions
//! - Attempts are an explicit ordered list, not nested retries
//! - The travel route is always walked forward; reversal is applied to graphs
//! - An add-on identical to the base contributes no graph of its own

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::DataHandle;
use crate::drv::{DrvInfo, DrvStatus};
use crate::error::DrvReason;
use crate::routing::cache::GraphCache;
use crate::routing::matcher::{MapValidation, MatchOutcome, Matcher};
use crate::routing::route_string::walked_route;
use crate::routing::specified::SpecifiedRouting;
use crate::routing::types::Routing;
use crate::travel::types::TravelRoute;

/// Outcome of map validation for one routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapInfo {
    pub processed: bool,
    pub valid: bool,
    /// Step whose off point is missing from the map, -1 when valid.
    pub missing_city_index: i32,
    pub missing_carrier: bool,
    /// Map paths the route was matched along.
    pub route_strings: Vec<String>,
    pub drv_status: DrvStatus,
    pub drv_infos: Vec<DrvInfo>,
    /// Missing city index after the last domestic validation retry.
    pub post_drv_missing_index: i32,
    /// Why the failed match did not fall back to DRV.
    #[serde(default)]
    pub drv_ineligible: Option<DrvReason>,
}

impl Default for MapInfo {
    fn default() -> Self {
        Self {
            processed: false,
            valid: false,
            missing_city_index: -1,
            missing_carrier: false,
            route_strings: Vec::new(),
            drv_status: DrvStatus::NotPerformed,
            drv_infos: Vec::new(),
            post_drv_missing_index: -1,
            drv_ineligible: None,
        }
    }
}

/// One way of laying the route over the maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attempt {
    Plain,
    Reversed,
    WithOrigAddon {
        base_reversed: bool,
        addon_reversed: bool,
    },
    WithDestAddon {
        base_reversed: bool,
        addon_reversed: bool,
    },
    WithBothAddons {
        base_reversed: bool,
        orig_reversed: bool,
        dest_reversed: bool,
    },
}

impl Attempt {
    /// Ordered attempt list for the add-ons present.
    pub fn sequence(has_orig: bool, has_dest: bool) -> Vec<Attempt> {
        let mut out = vec![Attempt::Plain, Attempt::Reversed];
        for base_reversed in [false, true] {
            if has_orig {
                for addon_reversed in [false, true] {
                    out.push(Attempt::WithOrigAddon {
                        base_reversed,
                        addon_reversed,
                    });
                }
            }
            if has_dest {
                for addon_reversed in [false, true] {
                    out.push(Attempt::WithDestAddon {
                        base_reversed,
                        addon_reversed,
                    });
                }
            }
            if has_orig && has_dest {
                for orig_reversed in [false, true] {
                    for dest_reversed in [false, true] {
                        out.push(Attempt::WithBothAddons {
                            base_reversed,
                            orig_reversed,
                            dest_reversed,
                        });
                    }
                }
            }
        }
        out
    }

    pub fn label(&self) -> &'static str {
        match self {
            Attempt::Plain => "Plain",
            Attempt::Reversed => "Reversed",
            Attempt::WithOrigAddon { base_reversed: false, .. } => "WithOrigAddon",
            Attempt::WithOrigAddon { base_reversed: true, .. } => "ReversedWithOrigAddon",
            Attempt::WithDestAddon { base_reversed: false, .. } => "WithDestAddon",
            Attempt::WithDestAddon { base_reversed: true, .. } => "ReversedWithDestAddon",
            Attempt::WithBothAddons { base_reversed: false, .. } => "WithBothAddons",
            Attempt::WithBothAddons { base_reversed: true, .. } => "ReversedWithBothAddons",
        }
    }

    /// (base, orig add-on, dest add-on) orientations; `None` when the graph is unused.
    fn orientation(&self) -> (bool, Option<bool>, Option<bool>) {
        match *self {
            Attempt::Plain => (false, None, None),
            Attempt::Reversed => (true, None, None),
            Attempt::WithOrigAddon {
                base_reversed,
                addon_reversed,
            } => (base_reversed, Some(addon_reversed), None),
            Attempt::WithDestAddon {
                base_reversed,
                addon_reversed,
            } => (base_reversed, None, Some(addon_reversed)),
            Attempt::WithBothAddons {
                base_reversed,
                orig_reversed,
                dest_reversed,
            } => (base_reversed, Some(orig_reversed), Some(dest_reversed)),
        }
    }
}

/// Validates travel routes against specified routing maps.
#[derive(Clone)]
pub struct SpecifiedRoutingValidator {
    data: Arc<dyn DataHandle>,
    cache: GraphCache,
}

impl SpecifiedRoutingValidator {
    pub fn new(data: Arc<dyn DataHandle>, cache: GraphCache) -> Self {
        Self { data, cache }
    }

    fn graph(
        &self,
        routing: &Routing,
        date: NaiveDate,
        base: Option<&SpecifiedRouting>,
        reversed: bool,
    ) -> Option<Arc<SpecifiedRouting>> {
        self.cache
            .get_or_compile(routing, date, self.data.as_ref(), base, reversed)
    }

    fn matcher_for(&self, route: &TravelRoute) -> MapValidation {
        let alliances: BTreeMap<String, String> = route
            .route
            .iter()
            .filter_map(|cc| {
                self.data
                    .alliance(&cc.carrier)
                    .map(|alliance| (cc.carrier.clone(), alliance))
            })
            .collect();
        MapValidation::new().with_alliances(alliances)
    }

    /// Validate `route` against the routing's map and optional add-on maps.
    ///
    /// Returns `true` when some attempt matches or when the routing has no
    /// map. On failure `map_info` carries the best attempt's missing city,
    /// clamped to the route.
    pub fn validate(
        &self,
        route: &TravelRoute,
        routing: &Routing,
        map_info: &mut MapInfo,
        date: NaiveDate,
        orig_addon: Option<&Routing>,
        dest_addon: Option<&Routing>,
    ) -> bool {
        let Some(base) = self.graph(routing, date, None, false) else {
            tracing::debug!(routing = %routing.id, "Routing has no map");
            return true;
        };
        map_info.processed = true;

        if route.is_empty() {
            map_info.valid = true;
            map_info.missing_city_index = -1;
            return true;
        }

        let orig_addon = distinct_addon(orig_addon, routing);
        let dest_addon = distinct_addon(dest_addon, routing);

        let matcher = self.matcher_for(route);
        let mut best: Option<MatchOutcome> = None;

        for attempt in Attempt::sequence(orig_addon.is_some(), dest_addon.is_some()) {
            let (base_rev, orig_rev, dest_rev) = attempt.orientation();
            let Some(base_graph) = self.graph(routing, date, None, base_rev) else {
                continue;
            };
            let orig_graph = match (orig_addon, orig_rev) {
                (Some(addon), Some(rev)) => match self.graph(addon, date, Some(&base), rev) {
                    Some(g) => Some(g),
                    None => continue,
                },
                _ => None,
            };
            let dest_graph = match (dest_addon, dest_rev) {
                (Some(addon), Some(rev)) => match self.graph(addon, date, Some(&base), rev) {
                    Some(g) => Some(g),
                    None => continue,
                },
                _ => None,
            };

            let chain: Vec<&SpecifiedRouting> = orig_graph
                .as_deref()
                .into_iter()
                .chain(std::iter::once(&*base_graph))
                .chain(dest_graph.as_deref())
                .collect();

            let outcome = matcher.matches(&route.route, &chain);
            if outcome.matched {
                tracing::debug!(
                    routing = %routing.id,
                    attempt = attempt.label(),
                    route = %route.route_string(),
                    "Map validation passed"
                );
                map_info.valid = true;
                map_info.missing_city_index = -1;
                map_info.missing_carrier = false;
                map_info.route_strings = vec![walked_route(&chain, &outcome)];
                return true;
            }

            let better = best
                .as_ref()
                .map_or(true, |b| outcome.progress(route.len()) > b.progress(route.len()));
            if better {
                best = Some(outcome);
            }
        }

        let last = route.len() as i32 - 1;
        let (index, carrier) = best
            .map(|b| (b.missing_city_index.clamp(0, last), b.missing_carrier))
            .unwrap_or((0, false));
        tracing::debug!(
            routing = %routing.id,
            route = %route.route_string(),
            missing_city_index = index,
            missing_carrier = carrier,
            "Map validation failed"
        );
        map_info.valid = false;
        map_info.missing_city_index = index;
        map_info.missing_carrier = carrier;
        false
    }
}

/// Add-on with a map of its own; one identical to the base validates on the base.
fn distinct_addon<'r>(addon: Option<&'r Routing>, base: &Routing) -> Option<&'r Routing> {
    addon.filter(|a| a.id != base.id && a.has_maps())
}

impl std::fmt::Debug for SpecifiedRoutingValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecifiedRoutingValidator")
            .field("cached_graphs", &self.cache.len())
            .finish()
    }
}
