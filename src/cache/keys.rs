//! Cache Key Module
//!
//! Derives the cache key for each query shape. Each shape owns a distinct
//! prefix so the four key spaces never overlap.

use std::fmt;

use chrono::NaiveDate;

/// Date layout used in keys and accepted from callers.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// == Flight Query ==
/// One lookup, already validated, identified by its shape and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlightQuery {
    ByNumber(String),
    ByDate(NaiveDate),
    ByDeparture { city: String, date: NaiveDate },
    ByArrival { city: String, date: NaiveDate },
}

impl FlightQuery {
    /// Short shape label used in logs.
    pub fn shape(&self) -> &'static str {
        match self {
            FlightQuery::ByNumber(_) => "number",
            FlightQuery::ByDate(_) => "date",
            FlightQuery::ByDeparture { .. } => "departure",
            FlightQuery::ByArrival { .. } => "arrival",
        }
    }

    /// The cache key for this query.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FlightQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightQuery::ByNumber(number) => write!(f, "flight:num:{}", normalize(number)),
            FlightQuery::ByDate(date) => write!(f, "flights:date:{}", date.format(DATE_FORMAT)),
            FlightQuery::ByDeparture { city, date } => write!(
                f,
                "flights:dep:{}:{}",
                normalize(city),
                date.format(DATE_FORMAT)
            ),
            FlightQuery::ByArrival { city, date } => write!(
                f,
                "flights:arr:{}:{}",
                normalize(city),
                date.format(DATE_FORMAT)
            ),
        }
    }
}

/// Trim and uppercase, applied identically on write and read.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_key_by_number() {
        let query = FlightQuery::ByNumber(" ps101 ".to_string());
        assert_eq!(query.cache_key(), "flight:num:PS101");
    }

    #[test]
    fn test_key_by_date() {
        let query = FlightQuery::ByDate(date(2024, 1, 5));
        assert_eq!(query.cache_key(), "flights:date:2024-01-05");
    }

    #[test]
    fn test_key_by_departure_and_arrival() {
        let departure = FlightQuery::ByDeparture {
            city: " kyiv ".to_string(),
            date: date(2024, 1, 1),
        };
        let arrival = FlightQuery::ByArrival {
            city: "Kyiv".to_string(),
            date: date(2024, 1, 1),
        };

        assert_eq!(departure.cache_key(), "flights:dep:KYIV:2024-01-01");
        assert_eq!(arrival.cache_key(), "flights:arr:KYIV:2024-01-01");
    }

    #[test]
    fn test_shape_labels() {
        assert_eq!(FlightQuery::ByNumber("X".into()).shape(), "number");
        assert_eq!(FlightQuery::ByDate(date(2024, 1, 1)).shape(), "date");
    }
}
