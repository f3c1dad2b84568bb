//! Flight API - A cached, rate-limited flight lookup service
//!
//! Validates lookup parameters, serves repeated lookups from a dual-TTL
//! in-memory cache, reads misses from a SQLite flight store and translates
//! failures into problem responses.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod repository;
pub mod service;
pub mod tasks;
pub mod validation;

pub use api::{create_router, AppState};
pub use config::Config;
pub use context::{RequestContext, TraceId};
pub use error::{QueryError, StoreError};
pub use rate_limit::{FixedWindowLimiter, RateLimitOptions};
pub use repository::{FlightRepository, SqliteFlightRepository};
pub use service::{CachedLookup, FlightService};
pub use tasks::{spawn_cleanup_task, spawn_replenish_task};
