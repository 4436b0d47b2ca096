//! Routing validation failure taxonomy.
//!
//! None of these abort a transaction. They are recorded on the `RoutingInfo`
//! of the fare being validated and surface as boolean flags.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::types::RoutingId;

/// Why a Domestic Routing Validation attempt was not made or did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum DrvReason {
    #[error("missing city index is out of range")]
    MissingCityIndexInvalid,

    #[error("missing city is not in the same country as its adjacent sectors")]
    NotSameCountry,

    #[error("sectors adjacent to the missing city are not on the same carrier")]
    NotSameCarrier,

    #[error("missing city is the origin or destination")]
    MissingCityOrigDest,

    #[error("no fare market for the local route")]
    NoFareMarket,

    #[error("no qualifying published fares in the local fare market")]
    NoPaxTypeFares,

    #[error("routing lookup for the local fare failed")]
    GetRoutingFailed,

    #[error("missing city was already checked")]
    AlreadyChecked,

    #[error("domestic validation is disabled")]
    Disabled,

    #[error("routing does not allow domestic validation")]
    RoutingNotApplicable,

    #[error("round-the-world map files nation or zone nodes")]
    RtwAreaMap,

    #[error("journey stays within one country")]
    DomesticJourney,
}

/// Non-fatal routing validation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// No routing row was found for the fare or one of its add-ons.
    #[error("routing data missing for {0}")]
    DataMissing(RoutingId),

    /// The graph walk could not align the flown route.
    #[error("map mismatch at city index {missing_city_index} (carrier: {missing_carrier})")]
    MapMismatch {
        missing_city_index: i32,
        missing_carrier: bool,
    },

    /// A numbered restriction rejected the itinerary.
    #[error("restriction {0} failed")]
    RestrictionFailed(u8),

    /// Mileage exceeded the maximum permitted surcharge band.
    #[error("mileage exceeded: {tpm} TPM against {mpm} MPM")]
    MileageExceeded { tpm: u32, mpm: u32 },

    /// Mileage validation is not permitted for this fare.
    #[error("mileage routing not applicable: {0}")]
    MileageNotApplicable(&'static str),

    /// The domestic fallback was not attempted or failed early.
    #[error("DRV not applied: {0}")]
    DrvIneligible(DrvReason),
}

/// Result type for data lookups that must resolve a routing.
pub type RoutingResult<T> = Result<T, RoutingError>;
