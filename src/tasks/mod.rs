//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache sweep: Removes expired cache entries at configured intervals
//! - Rate-limit window: Resets permits and releases queued requests

mod cleanup;
mod replenish;

pub use cleanup::spawn_cleanup_task;
pub use replenish::spawn_replenish_task;
