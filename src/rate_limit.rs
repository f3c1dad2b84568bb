//! Fixed-Window Rate Limiter
//!
//! Admits up to `permit_limit` requests per window. Requests over the limit
//! wait in a bounded FIFO queue and are released, oldest first, when the next
//! window opens. Requests that find the queue full are rejected.

use std::collections::VecDeque;
use std::time::Duration;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};

/// Body of every rejection.
pub const REJECTION_MESSAGE: &str = "Too many requests. Please try again in a few seconds.";

// == Options ==
/// Limits applied uniformly to all gated traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOptions {
    /// Requests admitted per window
    pub permit_limit: u32,
    /// Window length
    pub window: Duration,
    /// Requests allowed to wait for the next window
    pub queue_limit: usize,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self {
            permit_limit: 12,
            window: Duration::from_secs(12),
            queue_limit: 4,
        }
    }
}

// == Admission ==
/// Outcome of asking for a permit.
#[derive(Debug)]
pub enum Admission {
    /// A permit of the current window was taken
    Granted,
    /// Waiting in line; resolves when a later window hands over a permit
    Queued(oneshot::Receiver<()>),
    /// Window and queue are both full
    Rejected,
}

/// The request was not admitted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rate limit exceeded")]
pub struct RateLimited;

#[derive(Debug, Default)]
struct WindowState {
    permits_used: u32,
    queue: VecDeque<oneshot::Sender<()>>,
}

// == Fixed Window Limiter ==
#[derive(Debug)]
pub struct FixedWindowLimiter {
    options: RateLimitOptions,
    state: Mutex<WindowState>,
}

impl FixedWindowLimiter {
    pub fn new(options: RateLimitOptions) -> Self {
        Self {
            options,
            state: Mutex::new(WindowState::default()),
        }
    }

    pub fn options(&self) -> RateLimitOptions {
        self.options
    }

    // == Try Admit ==
    /// Takes a permit, joins the queue, or rejects, without waiting.
    pub async fn try_admit(&self) -> Admission {
        let mut state = self.state.lock().await;
        // Waiters whose request went away free their slot.
        state.queue.retain(|waiter| !waiter.is_closed());

        if state.queue.is_empty() && state.permits_used < self.options.permit_limit {
            state.permits_used += 1;
            Admission::Granted
        } else if state.queue.len() < self.options.queue_limit {
            let (tx, rx) = oneshot::channel();
            state.queue.push_back(tx);
            Admission::Queued(rx)
        } else {
            Admission::Rejected
        }
    }

    // == Acquire ==
    /// Waits until admitted, or fails immediately when rejected.
    ///
    /// Dropping the returned future while queued gives up the queue slot.
    pub async fn acquire(&self) -> Result<(), RateLimited> {
        match self.try_admit().await {
            Admission::Granted => Ok(()),
            Admission::Queued(waiter) => waiter.await.map_err(|_| RateLimited),
            Admission::Rejected => Err(RateLimited),
        }
    }

    // == Replenish ==
    /// Opens a new window: resets the permit count and hands permits to
    /// queued requests, oldest first. Returns how many were released.
    pub async fn replenish(&self) -> usize {
        let mut state = self.state.lock().await;
        state.permits_used = 0;

        let mut released = 0;
        while state.permits_used < self.options.permit_limit {
            let Some(waiter) = state.queue.pop_front() else {
                break;
            };
            if waiter.send(()).is_ok() {
                state.permits_used += 1;
                released += 1;
            }
        }
        released
    }

    /// Number of requests currently waiting.
    pub async fn queued(&self) -> usize {
        let state = self.state.lock().await;
        state.queue.iter().filter(|waiter| !waiter.is_closed()).count()
    }

    /// `Retry-After` value: the window length in whole seconds, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        let millis = self.options.window.as_millis() as u64;
        millis.div_ceil(1000)
    }

    /// The 429 response sent to rejected requests.
    pub fn rejection_response(&self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, self.retry_after_secs().to_string())],
            REJECTION_MESSAGE,
        )
            .into_response()
    }
}
