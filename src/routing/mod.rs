//! Specified routing subsystem.
//!
//! # Data Flow
//! ```text
//! Routing (filed map rows)
//!     → specified.rs (compile to an arena graph, reverse, chain add-ons)
//!     → cache.rs (one graph per routing, date and orientation)
//!     → matcher.rs (walk the travel route through 1..=3 chained graphs)
//!     → validator.rs (ordered attempts over orientation and add-ons)
//!     → MapInfo (valid, missing city index, walked route strings)
//! ```
//!
//! # Design Decisions
//! - Graphs are derived from an immutable borrow and never touch the Routing
//! - Nodes are addressed by index, not by pointer
//! - Failures report the attempt that got closest to the destination

pub mod cache;
pub mod matcher;
pub mod route_string;
pub mod specified;
pub mod types;
pub mod validator;

pub use cache::GraphCache;
pub use specified::SpecifiedRouting;
pub use types::{Routing, RoutingId, RoutingMapRow, RoutingRestriction};
pub use validator::{MapInfo, SpecifiedRoutingValidator};
