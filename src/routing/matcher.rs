//! Route-to-map matching.
//!
//! # Responsibilities
//! - Walk a city/carrier sequence through one compiled map or a chain of maps
//! - Enforce geographic order, carrier designations and map connectivity
//! - Report the furthest step reached and whether a carrier stopped it
//!
//! # Design Decisions
//! - Depth-first search over (map, node, point) states with a visited set,
//!   so cycles and alternate branches terminate
//! - An airline node governs the portion up to the next location node; a
//!   portion without one must be flown by the map's own carrier
//! - Location nodes may be overflown, consecutive points may share one
//!   nation or zone node
//! - Maps in a chain connect only through common points, from an exit of
//!   one map to an entry of the next

use std::collections::{BTreeMap, HashSet};

use crate::routing::specified::{NodeIdx, NodeKind, SpecifiedRouting};
use crate::routing::types::{INDUSTRY_CARRIER, SURFACE_CARRIER};
use crate::travel::types::{CityCarrier, Loc};

/// Result of matching one route against a chain of maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Index of the step whose off point could not be reached, -1 on success.
    pub missing_city_index: i32,
    /// The furthest failure was a carrier rejection.
    pub missing_carrier: bool,
    /// Nodes walked by a successful match, as (map, node) pairs.
    pub path: Vec<(usize, NodeIdx)>,
}

impl MatchOutcome {
    pub fn success(path: Vec<(usize, NodeIdx)>) -> Self {
        Self {
            matched: true,
            missing_city_index: -1,
            missing_carrier: false,
            path,
        }
    }

    pub fn failure(missing_city_index: usize, missing_carrier: bool) -> Self {
        Self {
            matched: false,
            missing_city_index: missing_city_index as i32,
            missing_carrier,
            path: Vec::new(),
        }
    }

    /// Steps matched before the failure; the route length on success.
    pub fn progress(&self, route_len: usize) -> usize {
        if self.matched {
            route_len
        } else {
            self.missing_city_index.max(0) as usize
        }
    }
}

/// Matches a travel route against compiled maps.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// `graphs` are chained in travel order.
    fn matches(&self, route: &[CityCarrier], graphs: &[&SpecifiedRouting]) -> MatchOutcome;
}

/// The map validation matcher.
#[derive(Debug, Clone, Default)]
pub struct MapValidation {
    alliances: BTreeMap<String, String>,
}

impl MapValidation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carrier to alliance code, for airline nodes filed with an alliance.
    pub fn with_alliances(mut self, alliances: BTreeMap<String, String>) -> Self {
        self.alliances = alliances;
        self
    }
}

impl Matcher for MapValidation {
    fn matches(&self, route: &[CityCarrier], graphs: &[&SpecifiedRouting]) -> MatchOutcome {
        if route.is_empty() {
            return MatchOutcome::success(Vec::new());
        }
        let mut walk = Walk::new(route, graphs, &self.alliances);
        let origin = &route[0].board;
        for (g, graph) in graphs.iter().enumerate() {
            for start in graph.start_nodes(origin) {
                walk.path.push((g, start));
                let state = State {
                    graph: g,
                    node: start,
                    point: 0,
                    governed: false,
                    mode: Mode::Start,
                };
                if walk.explore(state) {
                    return MatchOutcome::success(walk.path);
                }
                walk.path.pop();
            }
        }
        let (index, carrier) = walk.best.unwrap_or((0, false));
        MatchOutcome::failure(index, carrier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Mode {
    /// On the node the route started on.
    Start,
    /// On the node the current point landed on.
    Landed,
    /// Overflying a location or following an airline node.
    Passing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct State {
    graph: usize,
    node: NodeIdx,
    /// Index of the last matched point.
    point: usize,
    /// An airline node accepted the current step's carrier.
    governed: bool,
    mode: Mode,
}

struct Walk<'a> {
    points: Vec<&'a Loc>,
    carriers: Vec<&'a str>,
    graphs: &'a [&'a SpecifiedRouting],
    alliances: &'a BTreeMap<String, String>,
    visited: HashSet<State>,
    path: Vec<(usize, NodeIdx)>,
    best: Option<(usize, bool)>,
}

impl<'a> Walk<'a> {
    fn new(
        route: &'a [CityCarrier],
        graphs: &'a [&'a SpecifiedRouting],
        alliances: &'a BTreeMap<String, String>,
    ) -> Self {
        let mut points = Vec::with_capacity(route.len() + 1);
        points.push(&route[0].board);
        points.extend(route.iter().map(|cc| &cc.off));
        Self {
            points,
            carriers: route.iter().map(|cc| cc.carrier.as_str()).collect(),
            graphs,
            alliances,
            visited: HashSet::new(),
            path: Vec::new(),
            best: None,
        }
    }

    fn record(&mut self, step: usize, carrier: bool) {
        self.best = match self.best {
            Some((best, best_carrier)) if best == step => Some((best, best_carrier || carrier)),
            Some((best, best_carrier)) if best > step => Some((best, best_carrier)),
            _ => Some((step, carrier)),
        };
    }

    fn alliance(&self, carrier: &str) -> Option<&'a str> {
        self.alliances.get(carrier).map(String::as_str)
    }

    /// Carrier may fly a portion no airline node designates.
    fn fits_map_carrier(&self, graph: usize, carrier: &str) -> bool {
        let map_carrier = self.graphs[graph].carrier();
        carrier == SURFACE_CARRIER
            || carrier == map_carrier
            || map_carrier == INDUSTRY_CARRIER
            || self.alliance(carrier) == Some(map_carrier)
    }

    fn successors(&self, graph: usize, node: NodeIdx) -> Vec<(usize, NodeIdx)> {
        let map = self.graphs[graph];
        let mut out: Vec<(usize, NodeIdx)> =
            map.node(node).next.iter().map(|&n| (graph, n)).collect();

        let Some(next_map) = self.graphs.get(graph + 1) else {
            return out;
        };
        let current = map.node(node);
        if current.kind != NodeKind::City || !map.is_exit(node) {
            return out;
        }
        for code in &current.codes {
            if !map.is_common_point(code) && !next_map.is_common_point(code) {
                continue;
            }
            for entry in next_map.city_nodes(code).filter(|&e| next_map.is_entry(e)) {
                out.extend(next_map.node(entry).next.iter().map(|&n| (graph + 1, n)));
            }
        }
        out
    }

    fn explore(&mut self, state: State) -> bool {
        if !self.visited.insert(state) {
            return false;
        }
        let step = state.point;
        if step == self.carriers.len() {
            return true;
        }
        let carrier = self.carriers[step];
        let surface = carrier == SURFACE_CARRIER;
        let target = self.points[step + 1];
        let alliance = self.alliance(carrier);
        let here = self.graphs[state.graph].node(state.node);

        // Consecutive points inside the nation or zone just landed on.
        if state.mode != Mode::Passing
            && matches!(here.kind, NodeKind::Nation | NodeKind::Zone)
            && here.matches_loc(target)
        {
            if state.mode == Mode::Start || self.fits_map_carrier(state.graph, carrier) {
                let stay = State {
                    point: step + 1,
                    governed: false,
                    ..state
                };
                if self.explore(stay) {
                    return true;
                }
            } else {
                self.record(step, true);
            }
        }

        let successors = self.successors(state.graph, state.node);
        if successors.is_empty() {
            self.record(step, false);
        }

        for (graph, node) in successors {
            let next = self.graphs[graph].node(node);
            if next.kind == NodeKind::Airline {
                if surface || next.accepts_carrier(carrier, alliance) {
                    self.path.push((graph, node));
                    let follow = State {
                        graph,
                        node,
                        point: step,
                        governed: true,
                        mode: Mode::Passing,
                    };
                    if self.explore(follow) {
                        return true;
                    }
                    self.path.pop();
                } else {
                    self.record(step, true);
                }
                continue;
            }

            if !(state.governed || self.fits_map_carrier(graph, carrier)) {
                self.record(step, true);
                continue;
            }

            self.path.push((graph, node));
            if next.matches_loc(target) {
                let land = State {
                    graph,
                    node,
                    point: step + 1,
                    governed: false,
                    mode: Mode::Landed,
                };
                if self.explore(land) {
                    return true;
                }
            }
            let overfly = State {
                graph,
                node,
                point: step,
                governed: false,
                mode: Mode::Passing,
            };
            if self.explore(overfly) {
                return true;
            }
            self.path.pop();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryDataHandle;
    use crate::routing::types::{MapLocType, MapTag, Routing, RoutingId, RoutingMapRow};
    use chrono::NaiveDate;

    type Row<'a> = (u16, MapTag, u16, u16, MapLocType, &'a str);

    fn compile(carrier: &str, rows: &[Row<'_>]) -> SpecifiedRouting {
        let mut routing = Routing::new(RoutingId::new("ATP", carrier, 1, "0100"));
        for &(seq, tag, next, alt, loc_type, code) in rows {
            routing = routing.with_map(RoutingMapRow::new(seq, tag, next, alt, loc_type, code));
        }
        let data = InMemoryDataHandle::new();
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        SpecifiedRouting::initialize(&routing, date, &data, None).unwrap()
    }

    fn cc(board: (&str, &str), carrier: &str, off: (&str, &str)) -> CityCarrier {
        CityCarrier {
            board: Loc::new(board.0, board.1),
            off: Loc::new(off.0, off.1),
            carrier: carrier.to_string(),
            stopover: false,
        }
    }

    /// `CHI-AA-DFW-AA-HOU` style route inside one nation.
    fn route(nation: &str, steps: &[&str]) -> Vec<CityCarrier> {
        steps
            .windows(3)
            .step_by(2)
            .map(|w| cc((w[0], nation), w[1], (w[2], nation)))
            .collect()
    }

    fn slash_map() -> SpecifiedRouting {
        compile(
            "AA",
            &[
                (1, MapTag::Entry, 2, 0, MapLocType::City, "CHI"),
                (2, MapTag::Connect, 4, 3, MapLocType::City, "DFW"),
                (3, MapTag::Connect, 4, 0, MapLocType::City, "RDU"),
                (4, MapTag::Exit, 0, 0, MapLocType::City, "ORF"),
            ],
        )
    }

    #[test]
    fn test_slash_alternatives() {
        let map = slash_map();
        let matcher = MapValidation::new();
        let via_rdu = route("US", &["CHI", "AA", "RDU", "AA", "ORF"]);
        assert!(matcher.matches(&via_rdu, &[&map]).matched);
        let nonstop = route("US", &["CHI", "AA", "ORF"]);
        assert!(matcher.matches(&nonstop, &[&map]).matched);
    }

    #[test]
    fn test_both_alternatives_fails_at_second() {
        let map = slash_map();
        let outcome = MapValidation::new().matches(
            &route("US", &["CHI", "AA", "DFW", "AA", "RDU", "AA", "ORF"]),
            &[&map],
        );
        assert!(!outcome.matched);
        assert_eq!(outcome.missing_city_index, 1);
        assert!(!outcome.missing_carrier);
    }

    #[test]
    fn test_geographic_order() {
        let map = compile(
            "QF",
            &[
                (1, MapTag::Entry, 2, 0, MapLocType::City, "ADL"),
                (2, MapTag::Connect, 3, 0, MapLocType::City, "MEL"),
                (3, MapTag::Connect, 4, 0, MapLocType::City, "SYD"),
                (4, MapTag::Connect, 5, 0, MapLocType::City, "BNE"),
                (5, MapTag::Connect, 6, 0, MapLocType::City, "ROK"),
                (6, MapTag::Exit, 0, 0, MapLocType::City, "TSV"),
            ],
        );
        let matcher = MapValidation::new();
        let in_order = route("AU", &["MEL", "QF", "SYD", "QF", "ROK", "QF", "TSV"]);
        assert!(matcher.matches(&in_order, &[&map]).matched);

        let out_of_order = route("AU", &["MEL", "QF", "BNE", "QF", "SYD", "QF", "ROK", "QF", "TSV"]);
        let outcome = matcher.matches(&out_of_order, &[&map]);
        assert!(!outcome.matched);
        assert_eq!(outcome.missing_city_index, 1);
    }

    #[test]
    fn test_airline_node_constrains_carrier() {
        let map = compile(
            "QF",
            &[
                (1, MapTag::Entry, 2, 0, MapLocType::City, "MEL"),
                (2, MapTag::Connect, 3, 0, MapLocType::City, "SYD"),
                (3, MapTag::Connect, 4, 0, MapLocType::Airline, "NZ"),
                (4, MapTag::Exit, 0, 0, MapLocType::City, "AKL"),
            ],
        );
        let matcher = MapValidation::new();
        let on_nz = vec![
            cc(("MEL", "AU"), "QF", ("SYD", "AU")),
            cc(("SYD", "AU"), "NZ", ("AKL", "NZ")),
        ];
        assert!(matcher.matches(&on_nz, &[&map]).matched);

        let on_qf = vec![
            cc(("MEL", "AU"), "QF", ("SYD", "AU")),
            cc(("SYD", "AU"), "QF", ("AKL", "NZ")),
        ];
        let outcome = matcher.matches(&on_qf, &[&map]);
        assert!(!outcome.matched);
        assert_eq!(outcome.missing_city_index, 1);
        assert!(outcome.missing_carrier);
    }

    #[test]
    fn test_unlabelled_portion_needs_map_carrier() {
        let map = slash_map();
        let outcome = MapValidation::new().matches(&route("US", &["CHI", "UA", "DFW"]), &[&map]);
        assert!(!outcome.matched);
        assert_eq!(outcome.missing_city_index, 0);
        assert!(outcome.missing_carrier);
    }

    #[test]
    fn test_alliance_airline_node() {
        let map = compile(
            "LH",
            &[
                (1, MapTag::Entry, 2, 0, MapLocType::City, "FRA"),
                (2, MapTag::Connect, 3, 0, MapLocType::Airline, "*A"),
                (3, MapTag::Exit, 0, 0, MapLocType::City, "WAS"),
            ],
        );
        let route = vec![cc(("FRA", "DE"), "UA", ("WAS", "US"))];
        let plain = MapValidation::new();
        assert!(!plain.matches(&route, &[&map]).matched);
        let allied = MapValidation::new()
            .with_alliances(BTreeMap::from([("UA".to_string(), "*A".to_string())]));
        assert!(allied.matches(&route, &[&map]).matched);
    }

    #[test]
    fn test_nation_node_absorbs_domestic_points() {
        let map = compile(
            "BA",
            &[
                (1, MapTag::Entry, 2, 0, MapLocType::City, "NYC"),
                (2, MapTag::Exit, 0, 0, MapLocType::Nation, "GB"),
            ],
        );
        let route = vec![
            cc(("NYC", "US"), "BA", ("LON", "GB")),
            cc(("LON", "GB"), "BA", ("MAN", "GB")),
        ];
        assert!(MapValidation::new().matches(&route, &[&map]).matched);
    }

    #[test]
    fn test_surface_passes_airline_node() {
        let map = compile(
            "NZ",
            &[
                (1, MapTag::Entry, 2, 0, MapLocType::City, "AKL"),
                (2, MapTag::Connect, 3, 0, MapLocType::Airline, "NZ"),
                (3, MapTag::Exit, 0, 0, MapLocType::City, "LAX"),
            ],
        );
        let route = vec![cc(("AKL", "NZ"), SURFACE_CARRIER, ("LAX", "US"))];
        assert!(MapValidation::new().matches(&route, &[&map]).matched);
    }

    #[test]
    fn test_success_path_covers_walked_nodes() {
        let map = slash_map();
        let outcome = MapValidation::new().matches(&route("US", &["CHI", "AA", "ORF"]), &[&map]);
        let codes: Vec<_> = outcome
            .path
            .iter()
            .map(|&(_, n)| map.node(n).codes.iter().next().unwrap().clone())
            .collect();
        assert_eq!(codes.first().map(String::as_str), Some("CHI"));
        assert_eq!(codes.last().map(String::as_str), Some("ORF"));
    }
}
