//! Cache Module
//!
//! Provides in-memory caching with absolute and sliding TTL expiration.

mod clock;
mod entry;
mod keys;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, ExpirationPolicy};
pub use keys::{normalize, FlightQuery, DATE_FORMAT};
pub use stats::{CacheStats, StatsRecorder};
pub use store::CacheStore;
