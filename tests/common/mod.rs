//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use fare_routing::fare::{Fare, FareMarket};
use fare_routing::routing::types::{MapLocType, MapTag, Routing, RoutingId, RoutingMapRow};
use fare_routing::travel::{Loc, TravelSeg};
use fare_routing::{FareRoutingConfig, InMemoryDataHandle, PricingContext, RoutingController};

pub type Row<'a> = (u16, MapTag, u16, u16, MapLocType, &'a str);

pub fn travel_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

/// Nation of the handful of cities the tests fly through.
pub fn nation_of(city: &str) -> &'static str {
    match city {
        "LON" | "MAN" | "EDI" => "GB",
        "ADL" | "MEL" | "SYD" | "BNE" | "ROK" | "TSV" => "AU",
        "AKL" => "NZ",
        "MAD" => "ES",
        _ => "US",
    }
}

pub fn loc(city: &str) -> Loc {
    Loc::new(city, nation_of(city))
}

/// Segments from a `GRB-AA-STL` style list of alternating cities and carriers.
pub fn segments(steps: &[&str]) -> Vec<TravelSeg> {
    steps
        .windows(3)
        .step_by(2)
        .map(|w| TravelSeg::new(loc(w[0]), w[1], loc(w[2])))
        .collect()
}

/// A fare market over `steps`. The primary sector is the first sector crossing a border.
pub fn market(id: &str, steps: &[&str], governing_carrier: &str, fares: Vec<Fare>) -> FareMarket {
    let segments = segments(steps);
    let primary_sector = segments.iter().position(|s| s.board.nation != s.off.nation);
    FareMarket {
        id: id.to_string(),
        origin: segments[0].board.clone(),
        destination: segments[segments.len() - 1].off.clone(),
        governing_carrier: governing_carrier.to_string(),
        segments,
        primary_sector,
        global_direction: if primary_sector.is_some() { "AT" } else { "WH" }.to_string(),
        fares,
    }
}

pub fn map_routing(carrier: &str, tariff: u16, number: &str, rows: &[Row<'_>]) -> Routing {
    rows.iter().fold(
        Routing::new(RoutingId::new("ATP", carrier, tariff, number)),
        |routing, &(seq, tag, next, alt, loc_type, code)| {
            routing.with_map(RoutingMapRow::new(seq, tag, next, alt, loc_type, code))
        },
    )
}

/// A straight map of city nodes through `cities`.
pub fn chain_routing(carrier: &str, tariff: u16, number: &str, cities: &[&str]) -> Routing {
    let last = cities.len() as u16;
    cities.iter().enumerate().fold(
        Routing::new(RoutingId::new("ATP", carrier, tariff, number)),
        |routing, (i, city)| {
            let seq = i as u16 + 1;
            let tag = match seq {
                1 => MapTag::Entry,
                s if s == last => MapTag::Exit,
                _ => MapTag::Connect,
            };
            let next = if seq == last { 0 } else { seq + 1 };
            routing.with_map(RoutingMapRow::new(seq, tag, next, 0, MapLocType::City, city.to_string()))
        },
    )
}

pub fn controller(data: InMemoryDataHandle) -> RoutingController {
    controller_with(data, &FareRoutingConfig::default())
}

pub fn controller_with(data: InMemoryDataHandle, config: &FareRoutingConfig) -> RoutingController {
    RoutingController::new(Arc::new(data), config, PricingContext::new(travel_date()))
}
