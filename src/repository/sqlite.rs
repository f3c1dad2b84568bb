//! SQLite Flight Repository
//!
//! Runs the four named flight queries against a SQLite database file. Every
//! call opens its own read-only connection on a blocking worker and drops it
//! on every exit path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, InterruptHandle, OpenFlags, Params, Row};
use tokio::sync::oneshot;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::FlightRepository;
use crate::cache::{normalize, DATE_FORMAT};
use crate::error::StoreError;
use crate::models::Flight;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS Flights (
        FlightNumber TEXT NOT NULL PRIMARY KEY,
        DepartureDateTime TEXT NOT NULL,
        DepartureAirportCity TEXT NOT NULL,
        ArrivalAirportCity TEXT NOT NULL,
        DurationMinutes INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS IX_Flights_DepartureDateTime
        ON Flights (DepartureDateTime);";

// == Stored Queries ==
/// The named, parameterized reads the store exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredQuery {
    FlightByNumber,
    FlightsByDate,
    FlightsByDepartureCityAndDate,
    FlightsByArrivalCityAndDate,
}

impl StoredQuery {
    pub fn name(&self) -> &'static str {
        match self {
            StoredQuery::FlightByNumber => "dbo.GetFlightByNumber",
            StoredQuery::FlightsByDate => "dbo.GetFlightsByDate",
            StoredQuery::FlightsByDepartureCityAndDate => "dbo.GetFlightsByDepartureCityAndDate",
            StoredQuery::FlightsByArrivalCityAndDate => "dbo.GetFlightsByArrivalCityAndDate",
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            StoredQuery::FlightByNumber => {
                "SELECT FlightNumber, DepartureDateTime, DepartureAirportCity,
                        ArrivalAirportCity, DurationMinutes
                 FROM Flights
                 WHERE unicode_upper(FlightNumber) = ?1
                 LIMIT 1"
            }
            StoredQuery::FlightsByDate => {
                "SELECT FlightNumber, DepartureDateTime, DepartureAirportCity,
                        ArrivalAirportCity, DurationMinutes
                 FROM Flights
                 WHERE date(DepartureDateTime) = ?1
                 ORDER BY datetime(DepartureDateTime)"
            }
            StoredQuery::FlightsByDepartureCityAndDate => {
                "SELECT FlightNumber, DepartureDateTime, DepartureAirportCity,
                        ArrivalAirportCity, DurationMinutes
                 FROM Flights
                 WHERE unicode_upper(DepartureAirportCity) = ?1
                   AND date(DepartureDateTime) = ?2
                 ORDER BY datetime(DepartureDateTime)"
            }
            StoredQuery::FlightsByArrivalCityAndDate => {
                "SELECT FlightNumber, DepartureDateTime, DepartureAirportCity,
                        ArrivalAirportCity, DurationMinutes
                 FROM Flights
                 WHERE unicode_upper(ArrivalAirportCity) = ?1
                   AND date(DepartureDateTime) = ?2
                 ORDER BY datetime(DepartureDateTime)"
            }
        }
    }
}

// == Repository ==
/// Flight repository backed by a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteFlightRepository {
    path: PathBuf,
}

impl SqliteFlightRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the flights table and its index if they are missing.
    pub fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %self.path.display(), "flight store schema ready");
        Ok(())
    }

    /// Runs `work` on a fresh connection inside a blocking worker.
    ///
    /// Cancellation returns immediately and interrupts the statement still
    /// running on the worker; the worker then drops its connection.
    async fn run<T, F>(
        &self,
        label: &'static str,
        cancel: &CancellationToken,
        work: F,
    ) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let path = self.path.clone();
        let (handle_tx, handle_rx) = oneshot::channel::<InterruptHandle>();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        let worker_cancel = cancel.clone();
        let worker = task::spawn_blocking(move || {
            let _done = done_tx;
            let conn = open_read_only(&path)?;
            let _ = handle_tx.send(conn.get_interrupt_handle());
            // An interrupt issued before the statement starts is lost.
            if worker_cancel.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
            let result = work(&conn);
            drop(conn);
            result
        });

        // Outlives this future so a dropped request still interrupts the query.
        let watcher_cancel = cancel.clone();
        tokio::spawn(async move {
            let Ok(handle) = handle_rx.await else {
                return;
            };
            tokio::select! {
                _ = watcher_cancel.cancelled() => handle.interrupt(),
                _ = done_rx => {}
            }
        });

        debug!(query = label, "executing store query");
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(query = label, "store query cancelled");
                Err(StoreError::Cancelled)
            }
            joined = worker => joined.map_err(|e| StoreError::Worker(e.to_string()))?,
        }
    }
}

#[async_trait]
impl FlightRepository for SqliteFlightRepository {
    async fn get_by_number(
        &self,
        number: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Flight>, StoreError> {
        let query = StoredQuery::FlightByNumber;
        let number = normalize(number);
        self.run(query.name(), cancel, move |conn| {
            query_one(conn, query, params![number])
        })
        .await
    }

    async fn get_by_date(
        &self,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<Flight>, StoreError> {
        let query = StoredQuery::FlightsByDate;
        let date = date.format(DATE_FORMAT).to_string();
        self.run(query.name(), cancel, move |conn| {
            query_list(conn, query, params![date])
        })
        .await
    }

    async fn get_by_departure(
        &self,
        city: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<Flight>, StoreError> {
        let query = StoredQuery::FlightsByDepartureCityAndDate;
        let city = normalize(city);
        let date = date.format(DATE_FORMAT).to_string();
        self.run(query.name(), cancel, move |conn| {
            query_list(conn, query, params![city, date])
        })
        .await
    }

    async fn get_by_arrival(
        &self,
        city: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<Flight>, StoreError> {
        let query = StoredQuery::FlightsByArrivalCityAndDate;
        let city = normalize(city);
        let date = date.format(DATE_FORMAT).to_string();
        self.run(query.name(), cancel, move |conn| {
            query_list(conn, query, params![city, date])
        })
        .await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.run("health_check", &CancellationToken::new(), |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

// == Helpers ==
fn open_read_only(path: &Path) -> Result<Connection, StoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    register_unicode_upper(&conn)?;
    Ok(conn)
}

/// `unicode_upper(text)`: full Unicode upper-casing, the same folding cache
/// keys use. SQLite's own `upper` and `NOCASE` only fold ASCII.
fn register_unicode_upper(conn: &Connection) -> Result<(), StoreError> {
    conn.create_scalar_function(
        "unicode_upper",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: String = ctx.get(0)?;
            Ok(normalize(&value))
        },
    )?;
    Ok(())
}

fn query_one<P: Params>(
    conn: &Connection,
    query: StoredQuery,
    params: P,
) -> Result<Option<Flight>, StoreError> {
    let mut stmt = conn.prepare(query.sql())?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(map_flight(row)?)),
        None => Ok(None),
    }
}

fn query_list<P: Params>(
    conn: &Connection,
    query: StoredQuery,
    params: P,
) -> Result<Vec<Flight>, StoreError> {
    let mut stmt = conn.prepare(query.sql())?;
    let mut rows = stmt.query(params)?;
    let mut flights = Vec::new();
    while let Some(row) = rows.next()? {
        flights.push(map_flight(row)?);
    }
    Ok(flights)
}

/// Maps one row; a missing or mistyped column fails the whole call.
fn map_flight(row: &Row<'_>) -> Result<Flight, StoreError> {
    let raw_departure: String = row.get("DepartureDateTime")?;
    let departure_date_time = parse_timestamp(&raw_departure).ok_or_else(|| {
        StoreError::Mapping(format!(
            "DepartureDateTime '{raw_departure}' is not a timestamp"
        ))
    })?;

    let duration: i64 = row.get("DurationMinutes")?;
    let duration_minutes = u32::try_from(duration).map_err(|_| {
        StoreError::Mapping(format!("DurationMinutes {duration} is out of range"))
    })?;

    Ok(Flight {
        flight_number: row.get("FlightNumber")?,
        departure_date_time,
        departure_airport_city: row.get("DepartureAirportCity")?,
        arrival_airport_city: row.get("ArrivalAirportCity")?,
        duration_minutes,
    })
}

/// Accepts RFC 3339 or the `YYYY-MM-DD HH:MM:SS[.fff]` form SQLite writes,
/// the latter read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
