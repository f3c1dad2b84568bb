//! Request DTOs for the flight API
//!
//! Query-string parameters. Every field is optional so that a missing
//! parameter reaches the validator and is reported like any other bad input.

use serde::Deserialize;

/// Query string of `GET /api/flights?date=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateQuery {
    /// Departure date, `yyyy-MM-dd`
    #[serde(default)]
    pub date: Option<String>,
}

/// Query string of the departure and arrival lookups
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CityDateQuery {
    #[serde(default)]
    pub city: Option<String>,
    /// Departure date, `yyyy-MM-dd`
    #[serde(default)]
    pub date: Option<String>,
}
