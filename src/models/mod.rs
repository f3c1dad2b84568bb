//! Request and Response models for the flight API
//!
//! This module defines the entity and DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod flight;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use flight::Flight;
pub use requests::{CityDateQuery, DateQuery};
pub use responses::{HealthResponse, ProblemDetails, PROBLEM_JSON};
