//! API Handlers
//!
//! HTTP request handlers for each flight API endpoint.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::warn;

use crate::cache::ExpirationPolicy;
use crate::config::Config;
use crate::context::RequestContext;
use crate::error::{QueryError, Result};
use crate::models::{CityDateQuery, DateQuery, Flight, HealthResponse, ProblemDetails};
use crate::rate_limit::FixedWindowLimiter;
use crate::repository::{FlightRepository, SqliteFlightRepository};
use crate::service::FlightService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside lookups
    pub service: Arc<FlightService>,
    /// Store handle used by the readiness probe
    pub repository: Arc<dyn FlightRepository>,
    /// Admission control for `/api` routes
    pub limiter: Arc<FixedWindowLimiter>,
}

impl AppState {
    /// Creates a new AppState from its parts.
    pub fn new(
        service: Arc<FlightService>,
        repository: Arc<dyn FlightRepository>,
        limiter: Arc<FixedWindowLimiter>,
    ) -> Self {
        Self {
            service,
            repository,
            limiter,
        }
    }

    /// Builds the state over any repository using configured limits.
    pub fn with_repository(repository: Arc<dyn FlightRepository>, config: &Config) -> Self {
        let policy = ExpirationPolicy::new(config.cache_absolute_ttl(), config.cache_sliding_ttl());
        let service = Arc::new(FlightService::with_policy(repository.clone(), policy));
        let limiter = Arc::new(FixedWindowLimiter::new(config.rate_limit_options()));
        Self::new(service, repository, limiter)
    }

    /// Creates a new AppState from configuration, backed by the SQLite store.
    pub fn from_config(config: &Config) -> Self {
        let repository = Arc::new(SqliteFlightRepository::new(&config.database_path));
        Self::with_repository(repository, config)
    }
}

/// Handler for GET /api/flights/:flight_number
pub async fn flight_by_number_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    path: std::result::Result<Path<String>, PathRejection>,
    uri: Uri,
) -> Result<Response> {
    let Path(flight_number) = path.map_err(|rejection| invalid_request(rejection.body_text()))?;
    let flight = state
        .service
        .get_flight_by_number(Some(&flight_number), &ctx)
        .await?;

    Ok(match flight {
        Some(flight) => Json(flight).into_response(),
        None => ProblemDetails::new(
            StatusCode::NOT_FOUND,
            "Not Found",
            Some(format!("Flight '{}' was not found.", flight_number.trim())),
            uri.path(),
            ctx.trace_id.as_str(),
        )
        .into_response(),
    })
}

/// Handler for GET /api/flights?date=
pub async fn flights_by_date_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    query: std::result::Result<Query<DateQuery>, QueryRejection>,
) -> Result<Json<Vec<Flight>>> {
    let Query(query) = query.map_err(|rejection| invalid_request(rejection.body_text()))?;
    let flights = state
        .service
        .get_flights_by_date(query.date.as_deref(), &ctx)
        .await?;
    Ok(Json(flights))
}

/// Handler for GET /api/flights/departure?city=&date=
pub async fn flights_by_departure_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    query: std::result::Result<Query<CityDateQuery>, QueryRejection>,
) -> Result<Json<Vec<Flight>>> {
    let Query(query) = query.map_err(|rejection| invalid_request(rejection.body_text()))?;
    let flights = state
        .service
        .get_flights_by_departure(query.city.as_deref(), query.date.as_deref(), &ctx)
        .await?;
    Ok(Json(flights))
}

/// Handler for GET /api/flights/arrival?city=&date=
pub async fn flights_by_arrival_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    query: std::result::Result<Query<CityDateQuery>, QueryRejection>,
) -> Result<Json<Vec<Flight>>> {
    let Query(query) = query.map_err(|rejection| invalid_request(rejection.body_text()))?;
    let flights = state
        .service
        .get_flights_by_arrival(query.city.as_deref(), query.date.as_deref(), &ctx)
        .await?;
    Ok(Json(flights))
}

/// Malformed path or query string, reported like any other bad argument.
fn invalid_request(message: String) -> QueryError {
    QueryError::InvalidArgument(message)
}

/// Handler for GET /health/live
pub async fn live_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /health/ready
///
/// Ready when the store answers a trivial query.
pub async fn ready_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.repository.health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::healthy())),
        Err(err) => {
            warn!(error = %err, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::unhealthy()),
            )
        }
    }
}
