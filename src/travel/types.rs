//! Flown itinerary types consumed by routing validation.

use serde::{Deserialize, Serialize};

use crate::routing::types::SURFACE_CARRIER;

/// IATA sub-area of a location, as far as mileage exceptions care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SubArea {
    NorthAmerica,
    CentralAmerica,
    Caribbean,
    SouthAmerica,
    Europe,
    MiddleEast,
    Africa,
    Asia,
    SouthWestPacific,
    #[default]
    Unknown,
}

impl SubArea {
    /// IATA traffic conference of the sub-area, 0 when unknown.
    pub fn area(self) -> u8 {
        match self {
            SubArea::NorthAmerica
            | SubArea::CentralAmerica
            | SubArea::Caribbean
            | SubArea::SouthAmerica => 1,
            SubArea::Europe | SubArea::MiddleEast | SubArea::Africa => 2,
            SubArea::Asia | SubArea::SouthWestPacific => 3,
            SubArea::Unknown => 0,
        }
    }
}

/// A city with the geography routing rules look at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loc {
    pub code: String,
    pub nation: String,
    #[serde(default)]
    pub sub_area: SubArea,
}

impl Loc {
    pub fn new(code: impl Into<String>, nation: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            nation: nation.into(),
            sub_area: SubArea::Unknown,
        }
    }

    pub fn in_sub_area(mut self, sub_area: SubArea) -> Self {
        self.sub_area = sub_area;
        self
    }
}

/// US, Canada, Puerto Rico and the US Virgin Islands count as one domestic territory.
pub fn is_domestic_us_ca(nation: &str) -> bool {
    matches!(nation, "US" | "CA" | "PR" | "VI")
}

/// Whether two nations belong to the same domestic territory.
pub fn same_territory(a: &str, b: &str) -> bool {
    a == b || (is_domestic_us_ca(a) && is_domestic_us_ca(b))
}

/// One flown coupon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TravelSeg {
    pub board: Loc,
    pub off: Loc,
    pub carrier: String,
    #[serde(default)]
    pub flight_number: u32,
    /// Stopover at the off point.
    #[serde(default)]
    pub stopover: bool,
    /// Intermediate landings of the same flight.
    #[serde(default)]
    pub hidden_stops: Vec<Loc>,
}

impl TravelSeg {
    pub fn new(board: Loc, carrier: impl Into<String>, off: Loc) -> Self {
        Self {
            board,
            off,
            carrier: carrier.into(),
            flight_number: 0,
            stopover: false,
            hidden_stops: Vec::new(),
        }
    }

    pub fn is_surface(&self) -> bool {
        self.carrier == SURFACE_CARRIER
    }

    /// Both ends inside one nation.
    pub fn is_within(&self, nation: &str) -> bool {
        self.board.nation == nation && self.off.nation == nation
    }

    pub fn is_nonstop(&self) -> bool {
        self.hidden_stops.is_empty()
    }
}

/// One board/off/carrier step of a travel route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CityCarrier {
    pub board: Loc,
    pub off: Loc,
    pub carrier: String,
    #[serde(default)]
    pub stopover: bool,
}

impl CityCarrier {
    pub fn is_surface(&self) -> bool {
        self.carrier == SURFACE_CARRIER
    }
}

impl From<&TravelSeg> for CityCarrier {
    fn from(seg: &TravelSeg) -> Self {
        Self {
            board: seg.board.clone(),
            off: seg.off.clone(),
            carrier: seg.carrier.clone(),
            stopover: seg.stopover,
        }
    }
}

/// The ordered city/carrier sequence being validated, with its flown segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelRoute {
    pub route: Vec<CityCarrier>,
    pub segments: Vec<TravelSeg>,
    pub governing_carrier: String,
    /// Index into `segments` of the sector the fare is governed by.
    #[serde(default)]
    pub primary_sector: Option<usize>,
}

impl TravelRoute {
    pub fn len(&self) -> usize {
        self.route.len()
    }

    pub fn is_empty(&self) -> bool {
        self.route.is_empty()
    }

    pub fn origin(&self) -> Option<&Loc> {
        self.route.first().map(|cc| &cc.board)
    }

    pub fn destination(&self) -> Option<&Loc> {
        self.route.last().map(|cc| &cc.off)
    }

    /// Board point of the first step followed by every off point.
    pub fn points(&self) -> Vec<&Loc> {
        let mut points = Vec::with_capacity(self.route.len() + 1);
        if let Some(first) = self.route.first() {
            points.push(&first.board);
        }
        points.extend(self.route.iter().map(|cc| &cc.off));
        points
    }

    /// Same journey flown backwards.
    pub fn reversed(&self) -> TravelRoute {
        let route = self
            .route
            .iter()
            .rev()
            .map(|cc| CityCarrier {
                board: cc.off.clone(),
                off: cc.board.clone(),
                carrier: cc.carrier.clone(),
                stopover: false,
            })
            .collect::<Vec<_>>();
        let segments = self
            .segments
            .iter()
            .rev()
            .map(|seg| TravelSeg {
                board: seg.off.clone(),
                off: seg.board.clone(),
                hidden_stops: seg.hidden_stops.iter().rev().cloned().collect(),
                ..seg.clone()
            })
            .collect::<Vec<_>>();
        let last = self.segments.len().saturating_sub(1);
        TravelRoute {
            route,
            segments,
            governing_carrier: self.governing_carrier.clone(),
            primary_sector: self.primary_sector.map(|p| last - p.min(last)),
        }
    }

    /// `ORG-CXR-PT-CXR-DST` rendering used in logs and diagnostics.
    pub fn route_string(&self) -> String {
        let mut out = String::new();
        for (i, cc) in self.route.iter().enumerate() {
            if i == 0 {
                out.push_str(&cc.board.code);
            }
            if cc.is_surface() {
                out.push_str("//");
            } else {
                out.push('-');
                out.push_str(&cc.carrier);
                out.push('-');
            }
            out.push_str(&cc.off.code);
        }
        out
    }

    /// Stable identity of the route for cache lookups.
    pub fn hash_key(&self) -> String {
        let mut key = format!(
            "{}.{}.{}",
            self.origin().map_or("", |l| l.code.as_str()),
            self.destination().map_or("", |l| l.code.as_str()),
            self.route.len()
        );
        for cc in &self.route {
            key.push(if cc.stopover { 'O' } else { 'X' });
            key.push_str(&cc.board.code);
            key.push_str(&cc.off.code);
            key.push_str(&cc.carrier);
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::travel::builder::route_from_segments;

    fn seg(b: &str, c: &str, o: &str) -> TravelSeg {
        TravelSeg::new(Loc::new(b, "US"), c, Loc::new(o, "US"))
    }

    #[test]
    fn test_route_string_and_points() {
        let route = route_from_segments(
            vec![seg("CHI", "AA", "DFW"), seg("DFW", "XX", "HOU")],
            "AA",
            Some(0),
        );
        assert_eq!(route.route_string(), "CHI-AA-DFW//HOU");
        let codes: Vec<_> = route.points().iter().map(|l| l.code.as_str()).collect();
        assert_eq!(codes, vec!["CHI", "DFW", "HOU"]);
    }

    #[test]
    fn test_reversed_maps_primary_sector() {
        let route = route_from_segments(
            vec![seg("A", "AA", "B"), seg("B", "AA", "C"), seg("C", "AA", "D")],
            "AA",
            Some(0),
        );
        let rev = route.reversed();
        assert_eq!(rev.route_string(), "D-AA-C-AA-B-AA-A");
        assert_eq!(rev.primary_sector, Some(2));
        assert_eq!(rev.reversed().route_string(), route.route_string());
    }

    #[test]
    fn test_territory() {
        assert!(same_territory("US", "PR"));
        assert!(same_territory("FR", "FR"));
        assert!(!same_territory("US", "MX"));
        assert_eq!(SubArea::SouthAmerica.area(), 1);
    }
}
