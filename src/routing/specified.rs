//! Specified routing graph compiler.
//!
//! # Responsibilities
//! - Compile filed map rows into an arena of nodes with resolved successor sets
//! - Resolve zones to nation sets and index nodes by city and nation
//! - Produce the edge-inverted graph for routings that may be traveled backwards
//!
//! # Design Decisions
//! - Nodes live in a `Vec` and refer to each other by index, never by pointer
//! - A row's successors are its `next` node plus that node's whole `alt` chain
//! - Successor lists are kept sorted so reversal is exactly idempotent
//! - Compilation borrows the `Routing` immutably and never writes back

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::data::DataHandle;
use crate::routing::types::{MapLocType, MapTag, Routing, RoutingId, INDUSTRY_CARRIER};
use crate::travel::types::Loc;

/// Index of a node inside its graph's arena.
pub type NodeIdx = usize;

/// What a node matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    City,
    Airline,
    Nation,
    Zone,
    Any,
}

impl From<MapLocType> for NodeKind {
    fn from(loc_type: MapLocType) -> Self {
        match loc_type {
            MapLocType::City => NodeKind::City,
            MapLocType::Airline => NodeKind::Airline,
            MapLocType::Nation => NodeKind::Nation,
            MapLocType::Zone => NodeKind::Zone,
            MapLocType::Any => NodeKind::Any,
        }
    }
}

/// One compiled map node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapNode {
    /// Filed sequence id.
    pub id: u16,
    pub kind: NodeKind,
    pub tag: MapTag,
    /// City, carrier, nation or zone codes as filed.
    pub codes: BTreeSet<String>,
    /// Nations matched by a nation or zone node.
    pub nations: BTreeSet<String>,
    pub next: Vec<NodeIdx>,
    pub prev: Vec<NodeIdx>,
}

impl MapNode {
    pub fn is_location(&self) -> bool {
        self.kind != NodeKind::Airline
    }

    /// Whether a flown point lands on this node.
    pub fn matches_loc(&self, loc: &Loc) -> bool {
        match self.kind {
            NodeKind::City => self.codes.contains(&loc.code),
            NodeKind::Nation | NodeKind::Zone => self.nations.contains(&loc.nation),
            NodeKind::Any => true,
            NodeKind::Airline => false,
        }
    }

    /// Whether `carrier` may fly the portion this airline node designates.
    pub fn accepts_carrier(&self, carrier: &str, alliance: Option<&str>) -> bool {
        self.kind == NodeKind::Airline
            && (self.codes.contains(carrier)
                || self.codes.contains(INDUSTRY_CARRIER)
                || alliance.is_some_and(|a| self.codes.contains(a)))
    }
}

/// A compiled, indexed routing map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifiedRouting {
    pub id: RoutingId,
    pub as_of: NaiveDate,
    nodes: Vec<MapNode>,
    index_of: BTreeMap<u16, NodeIdx>,
    city_index: BTreeMap<String, BTreeSet<NodeIdx>>,
    nation_index: BTreeMap<String, BTreeSet<NodeIdx>>,
    nation_entry_index: BTreeMap<String, BTreeSet<NodeIdx>>,
    any_nodes: BTreeSet<NodeIdx>,
    terminal: bool,
    directional: bool,
    reversed: bool,
    common_points: BTreeSet<String>,
}

impl SpecifiedRouting {
    /// Compile a routing's map rows.
    ///
    /// Returns `None` when the routing has no map rows: there is nothing to
    /// validate. When `base` is given the routing is an add-on and records the
    /// cities it shares with the base as common points.
    pub fn initialize(
        routing: &Routing,
        as_of: NaiveDate,
        data: &dyn DataHandle,
        base: Option<&SpecifiedRouting>,
    ) -> Option<Self> {
        if routing.maps.is_empty() {
            return None;
        }

        let mut graph = Self {
            id: routing.id.clone(),
            as_of,
            nodes: Vec::with_capacity(routing.maps.len()),
            index_of: BTreeMap::new(),
            city_index: BTreeMap::new(),
            nation_index: BTreeMap::new(),
            nation_entry_index: BTreeMap::new(),
            any_nodes: BTreeSet::new(),
            terminal: routing.terminal_points_only,
            directional: routing.directional,
            reversed: false,
            common_points: BTreeSet::new(),
        };

        for row in &routing.maps {
            if let Some(&idx) = graph.index_of.get(&row.seq) {
                graph.nodes[idx].codes.insert(row.code.clone());
                continue;
            }
            let kind = NodeKind::from(row.loc_type);
            let nations = match kind {
                NodeKind::Nation => BTreeSet::from([row.code.clone()]),
                NodeKind::Zone => data
                    .zone_nations(&routing.id.vendor, &row.code)
                    .unwrap_or_else(|| {
                        tracing::warn!(routing = %routing.id, zone = %row.code, "Unknown zone on routing map");
                        BTreeSet::new()
                    }),
                _ => BTreeSet::new(),
            };
            graph.index_of.insert(row.seq, graph.nodes.len());
            graph.nodes.push(MapNode {
                id: row.seq,
                kind,
                tag: row.tag,
                codes: BTreeSet::from([row.code.clone()]),
                nations,
                next: Vec::new(),
                prev: Vec::new(),
            });
        }

        let alt_of: BTreeMap<u16, u16> = routing
            .maps
            .iter()
            .filter(|row| row.alt != 0)
            .map(|row| (row.seq, row.alt))
            .collect();

        for row in &routing.maps {
            if row.next == 0 {
                continue;
            }
            let Some(&from) = graph.index_of.get(&row.seq) else {
                continue;
            };
            let mut seen = BTreeSet::new();
            let mut cursor = row.next;
            while cursor != 0 && seen.insert(cursor) {
                match graph.index_of.get(&cursor) {
                    Some(&to) => graph.link(from, to),
                    None => {
                        tracing::warn!(routing = %routing.id, seq = row.seq, next = cursor, "Map row points at unknown node");
                    }
                }
                cursor = alt_of.get(&cursor).copied().unwrap_or(0);
            }
        }

        if let Some(base) = base {
            graph.common_points = graph
                .nodes
                .iter()
                .filter(|n| n.kind == NodeKind::City)
                .flat_map(|n| n.codes.iter())
                .filter(|code| base.city_index.contains_key(*code))
                .cloned()
                .collect();
        }

        graph.compress();
        graph.reindex();
        graph.reindex_nation();

        tracing::debug!(
            routing = %graph.id,
            nodes = graph.nodes.len(),
            common_points = graph.common_points.len(),
            "Compiled routing map"
        );
        Some(graph)
    }

    fn link(&mut self, from: NodeIdx, to: NodeIdx) {
        if let Err(pos) = self.nodes[from].next.binary_search(&to) {
            self.nodes[from].next.insert(pos, to);
        }
        if let Err(pos) = self.nodes[to].prev.binary_search(&from) {
            self.nodes[to].prev.insert(pos, from);
        }
    }

    /// Coalesce chains of identical nation/zone nodes.
    ///
    /// A node whose only successor is an identical nation/zone node with a
    /// single predecessor and the same tag absorbs that successor. Consecutive
    /// points inside one nation already stay on a single nation node, so the
    /// set of accepted routes is unchanged.
    pub fn compress(&mut self) {
        let mut merged_into: Vec<Option<NodeIdx>> = vec![None; self.nodes.len()];

        for u in 0..self.nodes.len() {
            if merged_into[u].is_some() {
                continue;
            }
            loop {
                let node = &self.nodes[u];
                if !matches!(node.kind, NodeKind::Nation | NodeKind::Zone) || node.next.len() != 1 {
                    break;
                }
                let v = node.next[0];
                let succ = &self.nodes[v];
                if v == u
                    || succ.kind != node.kind
                    || succ.tag != node.tag
                    || succ.prev.len() != 1
                    || succ.nations != node.nations
                {
                    break;
                }
                let absorbed_next = succ.next.clone();
                let absorbed_codes = succ.codes.clone();
                merged_into[v] = Some(u);
                self.nodes[u].codes.extend(absorbed_codes);
                self.nodes[u].next = absorbed_next;
            }
        }

        if merged_into.iter().all(Option::is_none) {
            return;
        }

        let mut remap = vec![0; self.nodes.len()];
        let mut kept = Vec::with_capacity(self.nodes.len());
        for (idx, node) in self.nodes.iter().enumerate() {
            if merged_into[idx].is_none() {
                remap[idx] = kept.len();
                kept.push(node.clone());
            }
        }
        for (idx, target) in merged_into.iter().enumerate() {
            if let Some(mut target) = *target {
                while let Some(t) = merged_into[target] {
                    target = t;
                }
                remap[idx] = remap[target];
            }
        }
        for node in &mut kept {
            node.next = node.next.iter().map(|&n| remap[n]).collect::<BTreeSet<_>>().into_iter().collect();
            node.prev.clear();
        }
        for from in 0..kept.len() {
            for to in kept[from].next.clone() {
                if let Err(pos) = kept[to].prev.binary_search(&from) {
                    kept[to].prev.insert(pos, from);
                }
            }
        }
        self.index_of = self
            .index_of
            .iter()
            .map(|(&seq, &idx)| (seq, remap[idx]))
            .collect();
        self.nodes = kept;
    }

    /// Rebuild the city and catch-all lookups.
    pub fn reindex(&mut self) {
        self.city_index.clear();
        self.any_nodes.clear();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node.kind {
                NodeKind::City => {
                    for code in &node.codes {
                        self.city_index.entry(code.clone()).or_default().insert(idx);
                    }
                }
                NodeKind::Any => {
                    self.any_nodes.insert(idx);
                }
                _ => {}
            }
        }
    }

    /// Rebuild the nation lookups. Entry-only lookups exist for terminal routings.
    pub fn reindex_nation(&mut self) {
        self.nation_index.clear();
        self.nation_entry_index.clear();
        for (idx, node) in self.nodes.iter().enumerate() {
            if !matches!(node.kind, NodeKind::Nation | NodeKind::Zone) {
                continue;
            }
            for nation in &node.nations {
                self.nation_index.entry(nation.clone()).or_default().insert(idx);
                if self.terminal && node.tag == MapTag::Entry {
                    self.nation_entry_index
                        .entry(nation.clone())
                        .or_default()
                        .insert(idx);
                }
            }
        }
    }

    /// Edge-inverted graph with entry and exit tags swapped.
    ///
    /// Returns `None` for directional routings, which may only be traveled in
    /// the filed direction. Reversing twice yields the original graph.
    pub fn reverse_map(&self) -> Option<SpecifiedRouting> {
        if self.directional || self.nodes.is_empty() {
            return None;
        }
        let mut reversed = self.clone();
        for node in &mut reversed.nodes {
            std::mem::swap(&mut node.next, &mut node.prev);
            node.tag = match node.tag {
                MapTag::Entry => MapTag::Exit,
                MapTag::Exit => MapTag::Entry,
                MapTag::Connect => MapTag::Connect,
            };
        }
        reversed.reversed = !self.reversed;
        reversed.reindex_nation();
        Some(reversed)
    }

    /// Whether the point appears anywhere on the map.
    pub fn contains(&self, loc: &Loc) -> bool {
        !self.any_nodes.is_empty()
            || self.city_index.contains_key(&loc.code)
            || self.nation_index.contains_key(&loc.nation)
    }

    /// Nodes a route may start on for its first point.
    pub fn start_nodes(&self, loc: &Loc) -> BTreeSet<NodeIdx> {
        let entry_ok = |idx: &NodeIdx| !self.terminal || self.nodes[*idx].tag == MapTag::Entry;
        let mut starts: BTreeSet<NodeIdx> = self
            .city_index
            .get(&loc.code)
            .into_iter()
            .flatten()
            .copied()
            .filter(entry_ok)
            .collect();
        let nations = if self.terminal {
            &self.nation_entry_index
        } else {
            &self.nation_index
        };
        if let Some(found) = nations.get(&loc.nation) {
            starts.extend(found.iter().copied());
        }
        starts.extend(self.any_nodes.iter().copied().filter(entry_ok));
        starts
    }

    /// City nodes carrying `code`.
    pub fn city_nodes(&self, code: &str) -> impl Iterator<Item = NodeIdx> + '_ {
        self.city_index.get(code).into_iter().flatten().copied()
    }

    pub fn node(&self, idx: NodeIdx) -> &MapNode {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[MapNode] {
        &self.nodes
    }

    pub fn node_by_seq(&self, seq: u16) -> Option<&MapNode> {
        self.index_of.get(&seq).map(|&idx| &self.nodes[idx])
    }

    /// Entry tag, or no predecessors.
    pub fn is_entry(&self, idx: NodeIdx) -> bool {
        let node = &self.nodes[idx];
        node.tag == MapTag::Entry || node.prev.is_empty()
    }

    /// Exit tag, or no successors.
    pub fn is_exit(&self, idx: NodeIdx) -> bool {
        let node = &self.nodes[idx];
        node.tag == MapTag::Exit || node.next.is_empty()
    }

    /// Map carrier.
    pub fn carrier(&self) -> &str {
        &self.id.carrier
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn is_common_point(&self, code: &str) -> bool {
        self.common_points.contains(code)
    }

    pub fn common_points(&self) -> &BTreeSet<String> {
        &self.common_points
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryDataHandle;
    use crate::routing::types::RoutingMapRow;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn routing(rows: &[(u16, MapTag, u16, u16, MapLocType, &str)]) -> Routing {
        let mut routing = Routing::new(RoutingId::new("ATP", "AA", 1, "0100"));
        for &(seq, tag, next, alt, loc_type, code) in rows {
            routing = routing.with_map(RoutingMapRow::new(seq, tag, next, alt, loc_type, code));
        }
        routing
    }

    fn slash_map() -> Routing {
        // CHI-DFW/RDU-ORF
        routing(&[
            (1, MapTag::Entry, 2, 0, MapLocType::City, "CHI"),
            (2, MapTag::Connect, 4, 3, MapLocType::City, "DFW"),
            (3, MapTag::Connect, 4, 0, MapLocType::City, "RDU"),
            (4, MapTag::Exit, 0, 0, MapLocType::City, "ORF"),
        ])
    }

    #[test]
    fn test_no_rows_means_no_graph() {
        let data = InMemoryDataHandle::new();
        let empty = Routing::new(RoutingId::new("ATP", "AA", 1, "0001"));
        assert!(SpecifiedRouting::initialize(&empty, date(), &data, None).is_none());
    }

    #[test]
    fn test_alt_chain_becomes_successors() {
        let data = InMemoryDataHandle::new();
        let graph = SpecifiedRouting::initialize(&slash_map(), date(), &data, None).unwrap();
        let chi = graph.city_nodes("CHI").next().unwrap();
        let succ: Vec<_> = graph
            .node(chi)
            .next
            .iter()
            .flat_map(|&i| graph.node(i).codes.iter().cloned())
            .collect();
        assert_eq!(succ, vec!["DFW".to_string(), "RDU".to_string()]);
        let orf = graph.city_nodes("ORF").next().unwrap();
        assert!(graph.is_exit(orf));
        assert!(graph.is_entry(chi));
    }

    #[test]
    fn test_reverse_map_is_idempotent() {
        let data = InMemoryDataHandle::new();
        let graph = SpecifiedRouting::initialize(&slash_map(), date(), &data, None).unwrap();
        let reversed = graph.reverse_map().unwrap();
        assert!(reversed.is_reversed());
        let orf = reversed.city_nodes("ORF").next().unwrap();
        assert_eq!(reversed.node(orf).tag, MapTag::Entry);
        assert_eq!(reversed.node(orf).next.len(), 2);
        assert_eq!(reversed.reverse_map().unwrap(), graph);
    }

    #[test]
    fn test_directional_map_does_not_reverse() {
        let data = InMemoryDataHandle::new();
        let mut filed = slash_map();
        filed.directional = true;
        let graph = SpecifiedRouting::initialize(&filed, date(), &data, None).unwrap();
        assert!(graph.reverse_map().is_none());
    }

    #[test]
    fn test_zone_resolves_to_nations() {
        let mut data = InMemoryDataHandle::new();
        data.add_zone("0000210", ["GB", "PL"]);
        let filed = routing(&[
            (1, MapTag::Entry, 2, 0, MapLocType::City, "CHI"),
            (2, MapTag::Exit, 0, 0, MapLocType::Zone, "0000210"),
        ]);
        let graph = SpecifiedRouting::initialize(&filed, date(), &data, None).unwrap();
        assert!(graph.contains(&Loc::new("WAW", "PL")));
        assert!(!graph.contains(&Loc::new("PAR", "FR")));
    }

    #[test]
    fn test_start_nodes_terminal() {
        let data = InMemoryDataHandle::new();
        let mut filed = routing(&[
            (1, MapTag::Entry, 3, 0, MapLocType::Nation, "GB"),
            (2, MapTag::Entry, 3, 0, MapLocType::Nation, "GB"),
            (3, MapTag::Connect, 4, 0, MapLocType::Nation, "GB"),
            (4, MapTag::Exit, 0, 0, MapLocType::City, "NYC"),
        ]);
        let lon = Loc::new("LON", "GB");

        let open = SpecifiedRouting::initialize(&filed, date(), &data, None).unwrap();
        assert_eq!(open.start_nodes(&lon).len(), 3);

        filed.terminal_points_only = true;
        let terminal = SpecifiedRouting::initialize(&filed, date(), &data, None).unwrap();
        assert_eq!(terminal.start_nodes(&lon).len(), 2);
    }

    #[test]
    fn test_compress_merges_identical_nation_chain() {
        let data = InMemoryDataHandle::new();
        let filed = routing(&[
            (1, MapTag::Entry, 2, 0, MapLocType::City, "CHI"),
            (2, MapTag::Connect, 3, 0, MapLocType::Nation, "GB"),
            (3, MapTag::Connect, 4, 0, MapLocType::Nation, "GB"),
            (4, MapTag::Exit, 0, 0, MapLocType::City, "AMS"),
        ]);
        let graph = SpecifiedRouting::initialize(&filed, date(), &data, None).unwrap();
        assert_eq!(graph.len(), 3);
        let gb = graph.node_by_seq(3).unwrap();
        assert_eq!(gb.id, 2);
        let ams = graph.city_nodes("AMS").next().unwrap();
        assert_eq!(gb.next, vec![ams]);
    }

    #[test]
    fn test_common_points_against_base() {
        let data = InMemoryDataHandle::new();
        let base = SpecifiedRouting::initialize(&slash_map(), date(), &data, None).unwrap();
        let addon = routing(&[
            (1, MapTag::Entry, 2, 0, MapLocType::City, "MSP"),
            (2, MapTag::Exit, 0, 0, MapLocType::City, "CHI"),
        ]);
        let graph = SpecifiedRouting::initialize(&addon, date(), &data, Some(&base)).unwrap();
        assert!(graph.is_common_point("CHI"));
        assert!(!graph.is_common_point("MSP"));
    }
}
