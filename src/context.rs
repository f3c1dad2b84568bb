//! Request Context
//!
//! Per-request correlation id and cancellation signal, created at the HTTP
//! boundary and passed explicitly down to the service and repository.

use std::fmt;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// == Trace Id ==
/// Correlates a request's log lines with its error response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TraceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Request Context ==
/// What every lookup receives from its inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: TraceId,
    /// Fires when the client goes away
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(trace_id: TraceId, cancel: CancellationToken) -> Self {
        Self { trace_id, cancel }
    }

    /// A context with a fresh trace id that is never cancelled.
    pub fn detached() -> Self {
        Self::new(TraceId::generate(), CancellationToken::new())
    }
}
