//! Error types for the flight API
//!
//! Provides the store and query failure taxonomy using thiserror.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Non-standard "client closed request" status.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

// == Store Error Enum ==
/// Failure raised by the backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connectivity, syntax or constraint failure reported by the driver
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// A row could not be turned into a flight
    #[error("row mapping failed: {0}")]
    Mapping(String),

    /// The blocking worker running the query died
    #[error("store worker failed: {0}")]
    Worker(String),

    /// The caller's cancellation signal fired while the query was running
    #[error("store call cancelled")]
    Cancelled,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::InvalidColumnName(_)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => StoreError::Mapping(err.to_string()),
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.code == rusqlite::ErrorCode::OperationInterrupted =>
            {
                StoreError::Cancelled
            }
            other => StoreError::Database(other),
        }
    }
}

// == Query Error Enum ==
/// Every way a lookup can fail, as seen by the HTTP boundary.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Bad city, date or flight number; always correctable by the client
    #[error("{0}")]
    InvalidArgument(String),

    /// The client gave up before the lookup finished
    #[error("request cancelled")]
    Cancelled,

    /// The backing store failed; details stay in the logs
    #[error("store failure: {0}")]
    StoreFailure(#[source] StoreError),

    /// Anything else
    #[error("unexpected failure: {0}")]
    Unclassified(String),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => QueryError::Cancelled,
            other => QueryError::StoreFailure(other),
        }
    }
}

impl QueryError {
    /// Status the boundary answers with for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            QueryError::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::BAD_REQUEST),
            QueryError::StoreFailure(_) | QueryError::Unclassified(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// == Pending Failure ==
/// A failure returned by a handler that still has to be logged and rendered
/// by the request-context middleware, which knows the trace id and path.
#[derive(Debug, Clone)]
pub struct PendingFailure(pub Arc<QueryError>);

// == IntoResponse Implementation ==
impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let mut response = self.status_code().into_response();
        response
            .extensions_mut()
            .insert(PendingFailure(Arc::new(self)));
        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for lookups.
pub type Result<T> = std::result::Result<T, QueryError>;
