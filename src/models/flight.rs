//! Flight entity
//!
//! The value returned by every lookup. Serialized with camelCase field names,
//! which is the shape API clients already consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled flight. Immutable once read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    /// Flight number, e.g. `PS101`
    pub flight_number: String,
    /// Departure instant (UTC)
    pub departure_date_time: DateTime<Utc>,
    pub departure_airport_city: String,
    pub arrival_airport_city: String,
    /// Scheduled duration in minutes
    pub duration_minutes: u32,
}

impl Flight {
    pub fn new(
        flight_number: impl Into<String>,
        departure_date_time: DateTime<Utc>,
        departure_airport_city: impl Into<String>,
        arrival_airport_city: impl Into<String>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            flight_number: flight_number.into(),
            departure_date_time,
            departure_airport_city: departure_airport_city.into(),
            arrival_airport_city: arrival_airport_city.into(),
            duration_minutes,
        }
    }
}
