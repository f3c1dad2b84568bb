//! API Routes
//!
//! Configures the Axum router with all flight API endpoints.

use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    flight_by_number_handler, flights_by_arrival_handler, flights_by_date_handler,
    flights_by_departure_handler, live_handler, ready_handler, AppState,
};
use super::middleware::{panic_failure, rate_limit, request_context};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/flights/:flight_number` - One flight by number
/// - `GET /api/flights?date=` - Flights departing on a date
/// - `GET /api/flights/departure?city=&date=` - Flights leaving a city
/// - `GET /api/flights/arrival?city=&date=` - Flights landing in a city
/// - `GET /health/live` - Liveness probe
/// - `GET /health/ready` - Readiness probe (checks the store)
///
/// # Middleware
/// - Rate limiting: `/api` routes only
/// - Panics: caught and reported as unexpected server errors
/// - Request context: trace id, cancellation and error translation
/// - CORS: configured origins, or any origin when none are given
/// - Tracing: Logs all requests
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/api/flights", get(flights_by_date_handler))
        .route("/api/flights/departure", get(flights_by_departure_handler))
        .route("/api/flights/arrival", get(flights_by_arrival_handler))
        .route("/api/flights/:flight_number", get(flight_by_number_handler))
        .route_layer(from_fn_with_state(state.limiter.clone(), rate_limit));

    let health = Router::new()
        .route("/health/live", get(live_handler))
        .route("/health/ready", get(ready_handler));

    api.merge(health)
        .layer(CatchPanicLayer::custom(panic_failure))
        .layer(from_fn(request_context))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}
