//! Travel route subsystem.
//!
//! # Data Flow
//! ```text
//! FareMarket (flown segments, primary sector)
//!     → builder.rs (one city-carrier step per coupon, cached per market)
//!     → TravelRoute (immutable, shared via Arc)
//!     → split at gateways for constructed fares
//! ```

pub mod builder;
pub mod types;

pub use builder::{route_from_segments, RouteComponents, TravelRouteCache};
pub use types::{CityCarrier, Loc, SubArea, TravelRoute, TravelSeg};
