//! Fare-level routing orchestration.
//!
//! # Data Flow
//! ```text
//! FareMarket + fares
//!     → key.rs (RtgKey per fare)
//!     → memo.rs (one validation per key and travel route)
//!     → routing_controller.rs (restrictions, mileage, maps, DRV)
//!     → info.rs (RoutingInfo per key, FareResult per fare)
//! ```

pub mod info;
pub mod key;
pub mod memo;
pub mod routing_controller;

pub use info::{FareResult, MarketResult, RoutingInfo};
pub use key::RtgKey;
pub use memo::Memo;
pub use routing_controller::{PricingContext, RoutingController};
