//! Flight Query Service
//!
//! Single entry point for the four lookups. Owns the cache-aside protocol:
//! validate, derive the key, serve hits from the cache, send misses to the
//! repository and cache successful results.
//!
//! Concurrent misses on one key are not coalesced: each one queries the store
//! and the last write wins.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::cache::{CacheStats, CacheStore, ExpirationPolicy, FlightQuery};
use crate::context::RequestContext;
use crate::error::{QueryError, Result, StoreError};
use crate::models::Flight;
use crate::repository::FlightRepository;
use crate::validation::{normalize_flight_number, parse_date, validate_city};

// == Cached Lookup ==
/// What the cache holds: one flight, or the full result of a list query.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedLookup {
    Flight(Flight),
    Flights(Vec<Flight>),
}

// == Flight Service ==
/// Cache-aside query service shared by every request.
pub struct FlightService {
    repository: Arc<dyn FlightRepository>,
    cache: Arc<CacheStore<CachedLookup>>,
}

impl FlightService {
    /// Creates a service over `repository` and an explicitly supplied cache.
    pub fn new(
        repository: Arc<dyn FlightRepository>,
        cache: Arc<CacheStore<CachedLookup>>,
    ) -> Self {
        Self { repository, cache }
    }

    /// Creates a service with its own system-clock cache.
    pub fn with_policy(repository: Arc<dyn FlightRepository>, policy: ExpirationPolicy) -> Self {
        Self::new(repository, Arc::new(CacheStore::new(policy)))
    }

    pub fn cache(&self) -> &Arc<CacheStore<CachedLookup>> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // == By Number ==
    /// Looks up one flight. A "not found" answer is never cached.
    pub async fn get_flight_by_number(
        &self,
        flight_number: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<Option<Flight>> {
        let number = normalize_flight_number(flight_number)?;
        let query = FlightQuery::ByNumber(number.clone());
        let key = query.cache_key();

        match self.cache.get(&key) {
            Some(CachedLookup::Flight(flight)) => {
                info!(trace_id = %ctx.trace_id, %key, "cache HIT");
                return Ok(Some(flight));
            }
            Some(CachedLookup::Flights(_)) => {
                return Err(QueryError::Unclassified(format!(
                    "cache entry {key} holds a list"
                )));
            }
            None => info!(trace_id = %ctx.trace_id, %key, "cache MISS"),
        }

        let fetched = self
            .repository
            .get_by_number(&number, &ctx.cancel)
            .await
            .map_err(|err| self.store_failed(&query, ctx, err))?;

        match fetched {
            Some(flight) => {
                self.cache
                    .insert(key.clone(), CachedLookup::Flight(flight.clone()));
                info!(
                    trace_id = %ctx.trace_id,
                    %key,
                    ttl_secs = self.cache.policy().absolute_ttl.as_secs(),
                    "flight cached"
                );
                Ok(Some(flight))
            }
            None => {
                info!(trace_id = %ctx.trace_id, flight_number = %number, "flight not found");
                Ok(None)
            }
        }
    }

    // == By Date ==
    /// Flights departing on a date. Empty results are cached.
    pub async fn get_flights_by_date(
        &self,
        date: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<Vec<Flight>> {
        let date = parse_date(date)?;
        let query = FlightQuery::ByDate(date);
        self.load_list(query, ctx, || self.repository.get_by_date(date, &ctx.cancel))
            .await
    }

    // == By Departure ==
    /// Flights leaving a city on a date.
    pub async fn get_flights_by_departure(
        &self,
        city: Option<&str>,
        date: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<Vec<Flight>> {
        let city = validate_city(city)?;
        let date = parse_date(date)?;
        let query = FlightQuery::ByDeparture {
            city: city.clone(),
            date,
        };
        self.load_list(query, ctx, || {
            self.repository.get_by_departure(&city, date, &ctx.cancel)
        })
        .await
    }

    // == By Arrival ==
    /// Flights reaching a city that depart on a date.
    pub async fn get_flights_by_arrival(
        &self,
        city: Option<&str>,
        date: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<Vec<Flight>> {
        let city = validate_city(city)?;
        let date = parse_date(date)?;
        let query = FlightQuery::ByArrival {
            city: city.clone(),
            date,
        };
        self.load_list(query, ctx, || {
            self.repository.get_by_arrival(&city, date, &ctx.cancel)
        })
        .await
    }

    /// Cache-aside for list shapes.
    async fn load_list<F, Fut>(
        &self,
        query: FlightQuery,
        ctx: &RequestContext,
        fetch: F,
    ) -> Result<Vec<Flight>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Vec<Flight>, StoreError>>,
    {
        let key = query.cache_key();

        match self.cache.get(&key) {
            Some(CachedLookup::Flights(flights)) => {
                info!(trace_id = %ctx.trace_id, %key, count = flights.len(), "cache HIT");
                return Ok(flights);
            }
            Some(CachedLookup::Flight(_)) => {
                return Err(QueryError::Unclassified(format!(
                    "cache entry {key} holds a single flight"
                )));
            }
            None => info!(trace_id = %ctx.trace_id, %key, "cache MISS"),
        }

        let flights = fetch()
            .await
            .map_err(|err| self.store_failed(&query, ctx, err))?;

        self.cache
            .insert(key.clone(), CachedLookup::Flights(flights.clone()));
        if flights.is_empty() {
            info!(trace_id = %ctx.trace_id, %key, "no flights found, empty list cached");
        } else {
            info!(trace_id = %ctx.trace_id, %key, count = flights.len(), "flights cached");
        }

        Ok(flights)
    }

    /// Logs a failed repository call and classifies it. Nothing is cached.
    fn store_failed(&self, query: &FlightQuery, ctx: &RequestContext, err: StoreError) -> QueryError {
        let err = QueryError::from(err);
        match &err {
            QueryError::Cancelled => {
                warn!(trace_id = %ctx.trace_id, shape = query.shape(), %query, "lookup cancelled");
            }
            other => {
                error!(
                    trace_id = %ctx.trace_id,
                    shape = query.shape(),
                    %query,
                    error = %other,
                    "error retrieving flights"
                );
            }
        }
        err
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Stand-in repository counting calls and answering from fixed data.
    #[derive(Default)]
    struct CountingRepository {
        calls: AtomicUsize,
        flights: Vec<Flight>,
        fail: bool,
        hang: bool,
        delay: Option<Duration>,
        seen: Mutex<Vec<String>>,
    }

    impl CountingRepository {
        fn with_flights(flights: Vec<Flight>) -> Self {
            Self {
                flights,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn enter(&self, call: String, cancel: &CancellationToken) -> std::result::Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(call);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.hang {
                cancel.cancelled().await;
                return Err(StoreError::Cancelled);
            }
            if self.fail {
                return Err(StoreError::Worker("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl FlightRepository for CountingRepository {
        async fn get_by_number(
            &self,
            number: &str,
            cancel: &CancellationToken,
        ) -> std::result::Result<Option<Flight>, StoreError> {
            self.enter(format!("number:{number}"), cancel).await?;
            Ok(self.flights.iter().find(|f| f.flight_number == number).cloned())
        }

        async fn get_by_date(
            &self,
            date: NaiveDate,
            cancel: &CancellationToken,
        ) -> std::result::Result<Vec<Flight>, StoreError> {
            self.enter(format!("date:{date}"), cancel).await?;
            Ok(self
                .flights
                .iter()
                .filter(|f| f.departure_date_time.date_naive() == date)
                .cloned()
                .collect())
        }

        async fn get_by_departure(
            &self,
            city: &str,
            date: NaiveDate,
            cancel: &CancellationToken,
        ) -> std::result::Result<Vec<Flight>, StoreError> {
            self.enter(format!("dep:{city}:{date}"), cancel).await?;
            Ok(self
                .flights
                .iter()
                .filter(|f| f.departure_airport_city.eq_ignore_ascii_case(city))
                .cloned()
                .collect())
        }

        async fn get_by_arrival(
            &self,
            city: &str,
            date: NaiveDate,
            cancel: &CancellationToken,
        ) -> std::result::Result<Vec<Flight>, StoreError> {
            self.enter(format!("arr:{city}:{date}"), cancel).await?;
            Ok(self
                .flights
                .iter()
                .filter(|f| f.arrival_airport_city.eq_ignore_ascii_case(city))
                .cloned()
                .collect())
        }

        async fn health_check(&self) -> std::result::Result<(), StoreError> {
            Ok(())
        }
    }

    fn kyiv_lviv() -> Flight {
        Flight::new(
            "PS101",
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap(),
            "Kyiv",
            "Lviv",
            75,
        )
    }

    fn service_with(repo: CountingRepository) -> (FlightService, Arc<CountingRepository>, Arc<ManualClock>) {
        let repo = Arc::new(repo);
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = Arc::new(CacheStore::with_clock(
            ExpirationPolicy::default(),
            clock.clone(),
        ));
        let service = FlightService::new(repo.clone(), cache);
        (service, repo, clock)
    }

    fn ctx() -> RequestContext {
        RequestContext::detached()
    }

    #[tokio::test]
    async fn test_hit_skips_repository() {
        let (service, repo, _) = service_with(CountingRepository::with_flights(vec![kyiv_lviv()]));

        let first = service.get_flight_by_number(Some("PS101"), &ctx()).await.unwrap();
        let second = service.get_flight_by_number(Some(" ps101 "), &ctx()).await.unwrap();

        assert_eq!(first, Some(kyiv_lviv()));
        assert_eq!(second, first);
        assert_eq!(repo.calls(), 1);
    }

    #[tokio::test]
    async fn test_repository_receives_normalized_number() {
        let (service, repo, _) = service_with(CountingRepository::default());

        service.get_flight_by_number(Some(" ps101 "), &ctx()).await.unwrap();
        assert_eq!(repo.seen.lock().unwrap().as_slice(), ["number:PS101"]);
    }

    #[tokio::test]
    async fn test_not_found_is_never_cached() {
        let (service, repo, _) = service_with(CountingRepository::default());

        for _ in 0..3 {
            let result = service.get_flight_by_number(Some("XX999"), &ctx()).await.unwrap();
            assert!(result.is_none());
        }

        assert_eq!(repo.calls(), 3);
        assert_eq!(service.cache_stats().insertions, 0);
    }

    #[tokio::test]
    async fn test_empty_list_is_cached() {
        let (service, repo, _) = service_with(CountingRepository::default());

        let first = service.get_flights_by_date(Some("2024-01-01"), &ctx()).await.unwrap();
        let second = service.get_flights_by_date(Some("2024-01-01"), &ctx()).await.unwrap();

        assert!(first.is_empty());
        assert!(second.is_empty());
        assert_eq!(repo.calls(), 1);
    }

    #[tokio::test]
    async fn test_city_case_and_whitespace_share_entry() {
        let (service, repo, _) = service_with(CountingRepository::with_flights(vec![kyiv_lviv()]));

        let first = service
            .get_flights_by_departure(Some(" kyiv "), Some("2024-01-01"), &ctx())
            .await
            .unwrap();
        let second = service
            .get_flights_by_departure(Some("KYIV"), Some("2024-01-01"), &ctx())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.calls(), 1);
        // The repository sees the trimmed, case-preserved city.
        assert_eq!(repo.seen.lock().unwrap()[0], "dep:kyiv:2024-01-01");
    }

    #[tokio::test]
    async fn test_departure_and_arrival_do_not_share_entries() {
        let (service, repo, _) = service_with(CountingRepository::with_flights(vec![kyiv_lviv()]));

        let departures = service
            .get_flights_by_departure(Some("Kyiv"), Some("2024-01-01"), &ctx())
            .await
            .unwrap();
        let arrivals = service
            .get_flights_by_arrival(Some("Kyiv"), Some("2024-01-01"), &ctx())
            .await
            .unwrap();

        assert_eq!(departures.len(), 1);
        assert!(arrivals.is_empty());
        assert_eq!(repo.calls(), 2);
    }

    #[tokio::test]
    async fn test_validation_failure_touches_nothing() {
        let (service, repo, _) = service_with(CountingRepository::default());

        let long_city = "x".repeat(101);
        let results = [
            service.get_flights_by_date(Some("2024/01/01"), &ctx()).await,
            service.get_flights_by_date(None, &ctx()).await,
            service
                .get_flights_by_departure(Some(&long_city), Some("2024-01-01"), &ctx())
                .await,
            service
                .get_flights_by_arrival(Some("Kyiv"), Some("2024-13-01"), &ctx())
                .await,
        ];

        for result in results {
            assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
        }
        assert!(matches!(
            service.get_flight_by_number(Some("   "), &ctx()).await,
            Err(QueryError::InvalidArgument(_))
        ));

        let stats = service.cache_stats();
        assert_eq!(repo.calls(), 0);
        assert_eq!(stats.hits + stats.misses, 0);
        assert_eq!(stats.insertions, 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_cached() {
        let (service, repo, _) = service_with(CountingRepository {
            fail: true,
            ..CountingRepository::default()
        });

        for _ in 0..2 {
            let result = service.get_flights_by_date(Some("2024-01-01"), &ctx()).await;
            assert!(matches!(result, Err(QueryError::StoreFailure(_))));
        }

        assert_eq!(repo.calls(), 2);
        assert_eq!(service.cache_stats().insertions, 0);
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_propagates_and_leaves_cache_untouched() {
        let (service, _repo, _) = service_with(CountingRepository {
            hang: true,
            ..CountingRepository::default()
        });
        let ctx = ctx();

        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let result = service
            .get_flights_by_arrival(Some("Kyiv"), Some("2024-01-01"), &ctx)
            .await;

        assert!(matches!(result, Err(QueryError::Cancelled)));
        assert_eq!(service.cache_stats().insertions, 0);
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_entry_expires_at_absolute_ttl_despite_reads() {
        let (service, repo, clock) = service_with(CountingRepository::with_flights(vec![kyiv_lviv()]));

        service.get_flights_by_date(Some("2024-01-01"), &ctx()).await.unwrap();
        for _ in 0..299 {
            clock.advance(Duration::from_secs(1));
            service.get_flights_by_date(Some("2024-01-01"), &ctx()).await.unwrap();
        }
        assert_eq!(repo.calls(), 1);

        clock.advance(Duration::from_secs(1));
        service.get_flights_by_date(Some("2024-01-01"), &ctx()).await.unwrap();
        assert_eq!(repo.calls(), 2);
    }

    #[tokio::test]
    async fn test_idle_entry_expires_at_sliding_ttl() {
        let (service, repo, clock) = service_with(CountingRepository::default());

        service.get_flights_by_date(Some("2024-01-01"), &ctx()).await.unwrap();
        clock.advance(Duration::from_secs(121));
        service.get_flights_by_date(Some("2024-01-01"), &ctx()).await.unwrap();

        assert_eq!(repo.calls(), 2);
    }

    #[tokio::test]
    async fn test_reads_every_90_seconds_keep_entry_until_cap() {
        let (service, repo, clock) = service_with(CountingRepository::default());

        service.get_flights_by_date(Some("2024-01-01"), &ctx()).await.unwrap();
        for _ in 0..3 {
            clock.advance(Duration::from_secs(90));
            service.get_flights_by_date(Some("2024-01-01"), &ctx()).await.unwrap();
        }
        assert_eq!(repo.calls(), 1);

        clock.advance(Duration::from_secs(30));
        service.get_flights_by_date(Some("2024-01-01"), &ctx()).await.unwrap();
        assert_eq!(repo.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_each_query_store() {
        // Misses are not coalesced; both callers reach the repository.
        let (service, repo, _) = service_with(CountingRepository {
            delay: Some(Duration::from_millis(20)),
            ..CountingRepository::default()
        });

        let (first_ctx, second_ctx) = (ctx(), ctx());
        let (a, b) = tokio::join!(
            service.get_flights_by_date(Some("2024-01-01"), &first_ctx),
            service.get_flights_by_date(Some("2024-01-01"), &second_ctx),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(repo.calls(), 2);
        assert_eq!(service.cache_stats().insertions, 2);
    }
}
