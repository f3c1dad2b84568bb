//! API Middleware
//!
//! Request context, error translation and rate limiting for the router.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::context::{RequestContext, TraceId};
use crate::error::{PendingFailure, QueryError, CLIENT_CLOSED_REQUEST};
use crate::models::ProblemDetails;
use crate::rate_limit::FixedWindowLimiter;

/// Where a failure happened, for logs and the problem body.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub trace_id: TraceId,
    pub method: Method,
    pub path: String,
}

// == Request Context ==
/// Outermost application layer.
///
/// Attaches a [`RequestContext`] to the request and turns any pending
/// failure left on the response into its final form. If the request future
/// is dropped (client disconnect), the context's token is cancelled.
pub async fn request_context(mut request: Request, next: Next) -> Response {
    let info = RequestInfo {
        trace_id: TraceId::generate(),
        method: request.method().clone(),
        path: request.uri().path().to_string(),
    };
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    request
        .extensions_mut()
        .insert(RequestContext::new(info.trace_id.clone(), cancel));

    let mut response = next.run(request).await;
    guard.disarm();

    match response.extensions_mut().remove::<PendingFailure>() {
        Some(PendingFailure(failure)) => translate_failure(&failure, &info),
        None => response,
    }
}

// == Error Translator ==
/// Logs a failed lookup and renders its response.
///
/// Cancellation yields a bodyless 499; everything else yields a problem body
/// carrying the trace id. Store and unexpected failures never leak details.
pub fn translate_failure(failure: &QueryError, info: &RequestInfo) -> Response {
    let trace_id = info.trace_id.as_str();
    let (title, detail) = match failure {
        QueryError::Cancelled => {
            warn!(trace_id, method = %info.method, path = %info.path, "request cancelled by client");
            return status_only(CLIENT_CLOSED_REQUEST);
        }
        QueryError::InvalidArgument(message) => {
            warn!(trace_id, method = %info.method, path = %info.path, error = %message, "invalid argument");
            ("Invalid argument", Some(message.clone()))
        }
        QueryError::StoreFailure(source) => {
            error!(trace_id, method = %info.method, path = %info.path, error = ?source, "database error");
            ("Database error occurred", None)
        }
        QueryError::Unclassified(message) => {
            error!(trace_id, method = %info.method, path = %info.path, error = %message, "unexpected error");
            ("Unexpected server error", None)
        }
    };

    ProblemDetails::new(failure.status_code(), title, detail, info.path.clone(), trace_id)
        .into_response()
}

fn status_only(code: u16) -> Response {
    StatusCode::from_u16(code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

// == Panic Handler ==
/// Turns a panic inside the application stack into an unclassified failure,
/// so it is logged and translated like any other.
pub fn panic_failure(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "request handler panicked".to_string()
    };
    QueryError::Unclassified(message).into_response()
}

// == Rate Limit ==
/// Gates a route behind the fixed-window limiter.
pub async fn rate_limit(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.acquire().await {
        Ok(()) => next.run(request).await,
        Err(_) => {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                retry_after = limiter.retry_after_secs(),
                "rate limit exceeded"
            );
            limiter.rejection_response()
        }
    }
}
