//! Rate-Limit Window Task
//!
//! Background task that opens a new rate-limit window on a fixed period.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::rate_limit::FixedWindowLimiter;

/// Spawns a background task that replenishes `limiter` once per window.
///
/// The first tick fires one full window after spawning, so the permits
/// available at startup count as the first window.
pub fn spawn_replenish_task(limiter: Arc<FixedWindowLimiter>) -> JoinHandle<()> {
    let window = limiter.options().window.max(Duration::from_millis(1));

    tokio::spawn(async move {
        info!(window_secs = window.as_secs(), "Starting rate-limit window task");

        let mut ticker = interval_at(Instant::now() + window, window);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let released = limiter.replenish().await;
            if released > 0 {
                debug!(released, "rate-limit window opened, queued requests released");
            }
        }
    })
}
