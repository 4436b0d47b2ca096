//! Mileage-basis validation.
//!
//! # Responsibilities
//! - Sum ticketed point mileage (TPM) over the flown route
//! - Compare against the market's maximum permitted mileage (MPM)
//! - Pick the smallest surcharge band that covers the excess
//! - Compute the South Atlantic alternative TPM for the exception pass
//!
//! # Design Decisions
//! - A failed mileage check is recorded, not enforced; the controller only
//!   fails the fare after the surcharge exception pass
//! - Missing TPM or MPM is a failed check, never a panic

use serde::{Deserialize, Serialize};

use crate::data::DataHandle;
use crate::travel::types::{SubArea, TravelRoute};

/// Surcharge percentages, smallest first.
pub const SURCHARGE_BANDS: [u8; 6] = [0, 5, 10, 15, 20, 25];

/// Outcome of a mileage check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MileageInfo {
    pub processed: bool,
    pub valid: bool,
    pub tpm: u32,
    pub mpm: u32,
    pub surcharge_pct: u8,
    /// TPM with the South Atlantic detour replaced by the direct sector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub south_atlantic_tpm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub south_atlantic_pct: Option<u8>,
}

impl MileageInfo {
    /// A surcharge is due, or the check failed.
    pub fn surcharge_applied(&self) -> bool {
        self.processed && (!self.valid || self.surcharge_pct > 0)
    }
}

/// Smallest band within `max_pct` such that `tpm <= mpm * (100 + band) / 100`.
pub fn surcharge_band(tpm: u32, mpm: u32, max_pct: u8) -> Option<u8> {
    let tpm = u64::from(tpm) * 100;
    SURCHARGE_BANDS
        .iter()
        .copied()
        .filter(|band| *band <= max_pct)
        .find(|band| tpm <= u64::from(mpm) * (100 + u64::from(*band)))
}

/// Surcharge amount for a fare amount and percentage.
pub fn surcharge_amount(fare_amount: f64, pct: u8) -> f64 {
    fare_amount * f64::from(pct) / 100.0
}

/// Total TPM of the route, `None` if any sector has no TPM.
pub fn total_tpm(route: &TravelRoute, data: &dyn DataHandle) -> Option<u32> {
    route
        .route
        .iter()
        .map(|cc| data.tpm(&cc.board.code, &cc.off.code))
        .sum()
}

fn is_area_two(sub_area: SubArea) -> bool {
    sub_area.area() == 2
}

/// Alternative TPM for journeys between South America and area 2 via North America.
///
/// The flown miles from the last South American point before North America to
/// the first area 2 point after it are replaced by the direct TPM between
/// those two points. Applies in either direction.
pub fn south_atlantic_tpm(route: &TravelRoute, data: &dyn DataHandle) -> Option<u32> {
    let points = route.points();
    let (first, last) = (points.first()?, points.last()?);
    let forward = first.sub_area == SubArea::SouthAmerica && is_area_two(last.sub_area);
    let backward = is_area_two(first.sub_area) && last.sub_area == SubArea::SouthAmerica;
    if !forward && !backward {
        return None;
    }

    let first_na = points.iter().position(|p| p.sub_area == SubArea::NorthAmerica)?;
    let last_na = points.iter().rposition(|p| p.sub_area == SubArea::NorthAmerica)?;
    let start = first_na.checked_sub(1)?;
    let end = last_na + 1;
    if end >= points.len() {
        return None;
    }

    let direct = data.tpm(&points[start].code, &points[end].code)?;
    let before: u32 = route.route[..start]
        .iter()
        .map(|cc| data.tpm(&cc.board.code, &cc.off.code))
        .sum::<Option<u32>>()?;
    let after: u32 = route.route[end..]
        .iter()
        .map(|cc| data.tpm(&cc.board.code, &cc.off.code))
        .sum::<Option<u32>>()?;
    Some(before + direct + after)
}

/// Validates a route on mileage basis.
#[derive(Debug, Clone, Copy)]
pub struct MileageValidator {
    max_surcharge_pct: u8,
}

impl Default for MileageValidator {
    fn default() -> Self {
        Self::new(25)
    }
}

impl MileageValidator {
    pub fn new(max_surcharge_pct: u8) -> Self {
        Self { max_surcharge_pct }
    }

    pub fn validate(&self, route: &TravelRoute, global_direction: &str, data: &dyn DataHandle) -> MileageInfo {
        let mut info = MileageInfo {
            processed: true,
            ..MileageInfo::default()
        };
        let (Some(origin), Some(destination)) = (route.origin(), route.destination()) else {
            return info;
        };
        let Some(tpm) = total_tpm(route, data) else {
            tracing::debug!(route = %route.route_string(), "TPM missing for a sector");
            return info;
        };
        let Some(mpm) = data.mpm(&origin.code, &destination.code, global_direction) else {
            tracing::debug!(origin = %origin.code, destination = %destination.code, "MPM missing");
            return info;
        };
        info.tpm = tpm;
        info.mpm = mpm;

        match surcharge_band(tpm, mpm, self.max_surcharge_pct) {
            Some(pct) => {
                info.valid = true;
                info.surcharge_pct = pct;
            }
            None => tracing::debug!(tpm, mpm, "Mileage exceeds the highest surcharge band"),
        }

        if let Some(alt) = south_atlantic_tpm(route, data) {
            info.south_atlantic_tpm = Some(alt);
            info.south_atlantic_pct = surcharge_band(alt, mpm, self.max_surcharge_pct);
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MpmEntry;
    use crate::data::InMemoryDataHandle;
    use crate::travel::builder::route_from_segments;
    use crate::travel::types::{Loc, TravelSeg};

    fn loc(code: &str, nation: &str, sub_area: SubArea) -> Loc {
        Loc::new(code, nation).in_sub_area(sub_area)
    }

    #[test]
    fn test_surcharge_bands() {
        assert_eq!(surcharge_band(1000, 1000, 25), Some(0));
        assert_eq!(surcharge_band(1040, 1000, 25), Some(5));
        assert_eq!(surcharge_band(1160, 1000, 25), Some(20));
        assert_eq!(surcharge_band(1250, 1000, 25), Some(25));
        assert_eq!(surcharge_band(1251, 1000, 25), None);
        assert_eq!(surcharge_band(1160, 1000, 15), None);
        assert!((surcharge_amount(400.0, 15) - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_mileage() {
        let mut data = InMemoryDataHandle::new();
        data.add_tpm("NYC", "CHI", 723);
        data.add_tpm("CHI", "LAX", 1749);
        data.add_mpm(MpmEntry {
            origin: "NYC".to_string(),
            destination: "LAX".to_string(),
            global_direction: "WH".to_string(),
            miles: 2200,
        });
        let route = route_from_segments(
            vec![
                TravelSeg::new(Loc::new("NYC", "US"), "AA", Loc::new("CHI", "US")),
                TravelSeg::new(Loc::new("CHI", "US"), "AA", Loc::new("LAX", "US")),
            ],
            "AA",
            None,
        );
        let info = MileageValidator::default().validate(&route, "WH", &data);
        assert!(info.valid);
        assert_eq!(info.tpm, 2472);
        assert_eq!(info.surcharge_pct, 15);
        assert!(info.surcharge_applied());

        let strict = MileageValidator::new(10).validate(&route, "WH", &data);
        assert!(!strict.valid);
        assert!(strict.surcharge_applied());
    }

    #[test]
    fn test_missing_mpm_fails() {
        let mut data = InMemoryDataHandle::new();
        data.add_tpm("NYC", "LAX", 2475);
        let route = route_from_segments(
            vec![TravelSeg::new(Loc::new("NYC", "US"), "AA", Loc::new("LAX", "US"))],
            "AA",
            None,
        );
        let info = MileageValidator::default().validate(&route, "WH", &data);
        assert!(info.processed);
        assert!(!info.valid);
    }

    #[test]
    fn test_south_atlantic_alternative() {
        let mut data = InMemoryDataHandle::new();
        data.add_tpm("SAO", "MIA", 4080);
        data.add_tpm("MIA", "NYC", 1092);
        data.add_tpm("NYC", "LON", 3458);
        data.add_tpm("SAO", "LON", 5868);
        let route = route_from_segments(
            vec![
                TravelSeg::new(loc("SAO", "BR", SubArea::SouthAmerica), "AA", loc("MIA", "US", SubArea::NorthAmerica)),
                TravelSeg::new(loc("MIA", "US", SubArea::NorthAmerica), "AA", loc("NYC", "US", SubArea::NorthAmerica)),
                TravelSeg::new(loc("NYC", "US", SubArea::NorthAmerica), "AA", loc("LON", "GB", SubArea::Europe)),
            ],
            "AA",
            None,
        );
        assert_eq!(south_atlantic_tpm(&route, &data), Some(5868));
        assert_eq!(south_atlantic_tpm(&route.reversed(), &data), Some(5868));
    }
}
