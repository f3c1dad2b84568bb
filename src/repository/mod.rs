//! Repository Module
//!
//! Data-access seam between the query service and the backing store. One
//! operation per query shape; every operation honors the caller's
//! cancellation signal and reports store failures instead of empty results.

mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::models::Flight;

pub use sqlite::{SqliteFlightRepository, StoredQuery};

/// Read access to flights.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// Looks up one flight by its normalized number.
    async fn get_by_number(
        &self,
        number: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Flight>, StoreError>;

    /// Flights departing on `date` (UTC).
    async fn get_by_date(
        &self,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<Flight>, StoreError>;

    /// Flights departing from `city` on `date`.
    async fn get_by_departure(
        &self,
        city: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<Flight>, StoreError>;

    /// Flights arriving in `city` that depart on `date`.
    async fn get_by_arrival(
        &self,
        city: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<Flight>, StoreError>;

    /// Checks that the store answers at all.
    async fn health_check(&self) -> Result<(), StoreError>;
}
