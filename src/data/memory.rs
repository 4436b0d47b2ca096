//! In-memory data handle built from a JSON snapshot.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::{CarrierPreference, DataHandle};
use crate::fare::FareMarket;
use crate::routing::types::{Routing, RoutingId};

/// Ticketed point mileage row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpmEntry {
    pub from: String,
    pub to: String,
    pub miles: u32,
}

/// Maximum permitted mileage row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpmEntry {
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub global_direction: String,
    pub miles: u32,
}

/// Serialized form of everything the handle serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSet {
    pub routings: Vec<Routing>,
    pub carrier_preferences: Vec<CarrierPreference>,
    pub zones: BTreeMap<String, BTreeSet<String>>,
    /// City code to nation code.
    pub cities: BTreeMap<String, String>,
    pub tpm: Vec<TpmEntry>,
    pub mpm: Vec<MpmEntry>,
    pub alliances: BTreeMap<String, String>,
    pub fare_markets: Vec<FareMarket>,
}

/// Indexed, read-only view over a `DataSet`.
#[derive(Debug, Default)]
pub struct InMemoryDataHandle {
    routings: HashMap<RoutingId, Vec<Arc<Routing>>>,
    preferences: HashMap<String, CarrierPreference>,
    zones: BTreeMap<String, BTreeSet<String>>,
    cities: BTreeMap<String, String>,
    tpm: HashMap<(String, String), u32>,
    mpm: HashMap<(String, String), Vec<MpmEntry>>,
    alliances: BTreeMap<String, String>,
    fare_markets: Vec<FareMarket>,
}

fn city_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl InMemoryDataHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data_set(data: DataSet) -> Self {
        let mut handle = Self::new();
        for routing in data.routings {
            handle.add_routing(routing);
        }
        for pref in data.carrier_preferences {
            handle.add_carrier_preference(pref);
        }
        for (zone, nations) in data.zones {
            handle.zones.insert(zone, nations);
        }
        handle.cities = data.cities;
        for entry in data.tpm {
            handle.add_tpm(&entry.from, &entry.to, entry.miles);
        }
        for entry in data.mpm {
            handle.add_mpm(entry);
        }
        handle.alliances = data.alliances;
        handle.fare_markets = data.fare_markets;
        handle
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: DataSet = serde_json::from_str(json)?;
        Ok(Self::from_data_set(data))
    }

    pub fn add_routing(&mut self, routing: Routing) {
        self.routings
            .entry(routing.id.clone())
            .or_default()
            .push(Arc::new(routing));
    }

    pub fn add_carrier_preference(&mut self, pref: CarrierPreference) {
        self.preferences.insert(pref.carrier.clone(), pref);
    }

    pub fn add_zone<I, S>(&mut self, zone: &str, nations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zones
            .insert(zone.to_string(), nations.into_iter().map(Into::into).collect());
    }

    pub fn add_city(&mut self, city: &str, nation: &str) {
        self.cities.insert(city.to_string(), nation.to_string());
    }

    pub fn add_tpm(&mut self, from: &str, to: &str, miles: u32) {
        self.tpm.insert(city_pair(from, to), miles);
    }

    pub fn add_mpm(&mut self, entry: MpmEntry) {
        self.mpm
            .entry(city_pair(&entry.origin, &entry.destination))
            .or_default()
            .push(entry);
    }

    pub fn add_alliance(&mut self, carrier: &str, alliance: &str) {
        self.alliances.insert(carrier.to_string(), alliance.to_string());
    }

    pub fn add_fare_market(&mut self, market: FareMarket) {
        self.fare_markets.push(market);
    }

    /// Every fare market in the snapshot.
    pub fn fare_markets(&self) -> &[FareMarket] {
        &self.fare_markets
    }
}

impl DataHandle for InMemoryDataHandle {
    fn get_routings(&self, id: &RoutingId) -> Vec<Arc<Routing>> {
        self.routings.get(id).cloned().unwrap_or_default()
    }

    fn get_carrier_preference(&self, carrier: &str, _date: NaiveDate) -> Option<CarrierPreference> {
        self.preferences.get(carrier).cloned()
    }

    fn zone_nations(&self, _vendor: &str, zone: &str) -> Option<BTreeSet<String>> {
        self.zones.get(zone).cloned()
    }

    fn tpm(&self, from: &str, to: &str) -> Option<u32> {
        self.tpm.get(&city_pair(from, to)).copied()
    }

    fn mpm(&self, origin: &str, destination: &str, global_direction: &str) -> Option<u32> {
        let entries = self.mpm.get(&city_pair(origin, destination))?;
        entries
            .iter()
            .find(|e| e.global_direction == global_direction)
            .or_else(|| entries.iter().find(|e| e.global_direction.is_empty()))
            .map(|e| e.miles)
    }

    fn city_nation(&self, city: &str) -> Option<String> {
        self.cities.get(city).cloned()
    }

    fn alliance(&self, carrier: &str) -> Option<String> {
        self.alliances.get(carrier).cloned()
    }

    fn local_fare_market(
        &self,
        origin: &str,
        destination: &str,
        carrier: &str,
    ) -> Option<FareMarket> {
        self.fare_markets
            .iter()
            .find(|m| {
                m.governing_carrier == carrier
                    && ((m.origin.code == origin && m.destination.code == destination)
                        || (m.origin.code == destination && m.destination.code == origin))
            })
            .cloned()
    }
}
