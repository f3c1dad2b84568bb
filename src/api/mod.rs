//! API Module
//!
//! HTTP handlers, middleware and routing for the flight lookup REST API.
//!
//! # Endpoints
//! - `GET /api/flights/:flight_number` - One flight by number
//! - `GET /api/flights?date=` - Flights departing on a date
//! - `GET /api/flights/departure?city=&date=` - Flights by departure city
//! - `GET /api/flights/arrival?city=&date=` - Flights by arrival city
//! - `GET /health/live` and `GET /health/ready` - Probes

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::{panic_failure, rate_limit, request_context, translate_failure, RequestInfo};
pub use routes::create_router;
