//! Input Validation
//!
//! Normalizes and rejects malformed lookup parameters before any cache or
//! store access. Pure functions; the only side effect is a warning log.

use chrono::NaiveDate;
use tracing::warn;

use crate::cache::DATE_FORMAT;
use crate::error::{QueryError, Result};

/// Longest accepted city name, in characters, after trimming.
pub const MAX_CITY_LENGTH: usize = 100;

/// Validates a city name and returns it trimmed, case preserved.
pub fn validate_city(raw: Option<&str>) -> Result<String> {
    let city = raw.map(str::trim).unwrap_or_default();
    if city.is_empty() {
        warn!("city is missing or blank");
        return Err(QueryError::InvalidArgument("City is required.".to_string()));
    }

    let length = city.chars().count();
    if length > MAX_CITY_LENGTH {
        warn!(length, max = MAX_CITY_LENGTH, "city name too long");
        return Err(QueryError::InvalidArgument(format!(
            "City name is too long (max {MAX_CITY_LENGTH} characters, got {length})."
        )));
    }

    Ok(city.to_string())
}

/// Parses an exact `yyyy-MM-dd` date.
///
/// Only the literal layout is accepted: four-digit year, two-digit month and
/// day, dash separators, no time component. Surrounding whitespace is trimmed.
pub fn parse_date(raw: Option<&str>) -> Result<NaiveDate> {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        warn!("date is missing or blank");
        return Err(QueryError::InvalidArgument(
            "Date is required. Expected format: yyyy-MM-dd.".to_string(),
        ));
    }

    if !has_iso_date_shape(value) {
        warn!(date = value, "date does not match yyyy-MM-dd");
        return Err(invalid_date(value));
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        warn!(date = value, "date is not a calendar date");
        invalid_date(value)
    })
}

/// Validates a flight number and returns it trimmed and uppercased.
pub fn normalize_flight_number(raw: Option<&str>) -> Result<String> {
    let number = raw.map(str::trim).unwrap_or_default();
    if number.is_empty() {
        warn!("flight number is missing or blank");
        return Err(QueryError::InvalidArgument(
            "Flight number is required.".to_string(),
        ));
    }
    Ok(number.to_uppercase())
}

fn has_iso_date_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

fn invalid_date(value: &str) -> QueryError {
    QueryError::InvalidArgument(format!(
        "Invalid date '{value}'. Expected format: yyyy-MM-dd."
    ))
}
