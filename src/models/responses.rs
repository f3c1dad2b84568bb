//! Response DTOs for the flight API
//!
//! Defines the structure of outgoing HTTP response bodies other than flights.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Media type of [`ProblemDetails`] bodies.
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Structured error body shared by every failing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// HTTP status code, repeated in the body
    pub status: u16,
    /// Short human-readable summary
    pub title: String,
    /// Occurrence-specific explanation, if it is safe to expose
    pub detail: Option<String>,
    /// Request path the problem occurred on
    pub instance: String,
    /// Correlates the response with server-side logs
    pub trace_id: String,
}

impl ProblemDetails {
    pub fn new(
        status: StatusCode,
        title: impl Into<String>,
        detail: Option<String>,
        instance: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            status: status.as_u16(),
            title: title.into(),
            detail,
            instance: instance.into(),
            trace_id: trace_id.into(),
        }
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self)).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        response
    }
}

/// Response body for the health probes
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status ("healthy" or "unhealthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a healthy response with current timestamp
    pub fn healthy() -> Self {
        Self::with_status("healthy")
    }

    pub fn unhealthy() -> Self {
        Self::with_status("unhealthy")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_details_serialize() {
        let problem = ProblemDetails::new(
            StatusCode::BAD_REQUEST,
            "Invalid argument",
            Some("City is required.".to_string()),
            "/api/flights/departure",
            "abc123",
        );

        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["title"], "Invalid argument");
        assert_eq!(json["detail"], "City is required.");
        assert_eq!(json["instance"], "/api/flights/departure");
        assert_eq!(json["traceId"], "abc123");
    }

    #[test]
    fn test_problem_details_null_detail() {
        let problem = ProblemDetails::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error occurred",
            None,
            "/api/flights",
            "abc123",
        );

        let json = serde_json::to_value(&problem).unwrap();
        assert!(json["detail"].is_null());
    }

    #[test]
    fn test_problem_details_response_headers() {
        let response = ProblemDetails::new(
            StatusCode::NOT_FOUND,
            "Not Found",
            None,
            "/api/flights/XX1",
            "t",
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            PROBLEM_JSON
        );
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
