//! Cache Entry Module
//!
//! Defines cache entries carrying two independent expirations: an absolute
//! deadline fixed at insertion and a sliding window reset on every read.

use std::time::Duration;

// == Expiration Policy ==
/// Absolute and sliding TTLs applied to every entry of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    /// Lifetime measured from insertion, unaffected by reads
    pub absolute_ttl: Duration,
    /// Idle time allowed between two reads
    pub sliding_ttl: Duration,
}

impl ExpirationPolicy {
    pub fn new(absolute_ttl: Duration, sliding_ttl: Duration) -> Self {
        Self {
            absolute_ttl,
            sliding_ttl,
        }
    }
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self {
            absolute_ttl: Duration::from_secs(5 * 60),
            sliding_ttl: Duration::from_secs(2 * 60),
        }
    }
}

// == Cache Entry ==
/// A cached value with its dual-expiration bookkeeping (Unix milliseconds).
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion timestamp
    pub inserted_at: u64,
    /// Timestamp of the last successful read (insertion counts as one)
    pub last_accessed_at: u64,
    /// Instant after which the entry is gone no matter how often it is read
    pub absolute_deadline: u64,
    sliding_window_ms: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry inserted at `now_ms` under `policy`.
    pub fn new(value: V, now_ms: u64, policy: &ExpirationPolicy) -> Self {
        Self {
            value,
            inserted_at: now_ms,
            last_accessed_at: now_ms,
            absolute_deadline: now_ms.saturating_add(policy.absolute_ttl.as_millis() as u64),
            sliding_window_ms: policy.sliding_ttl.as_millis() as u64,
        }
    }

    // == Is Expired ==
    /// Checks both policies at `now_ms`.
    ///
    /// The entry is expired once the absolute deadline is reached, or once it
    /// has sat unread for a full sliding window.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.absolute_deadline
            || now_ms.saturating_sub(self.last_accessed_at) >= self.sliding_window_ms
    }

    // == Touch ==
    /// Records a read, restarting the sliding window.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_accessed_at = now_ms;
    }

    // == Expires At ==
    /// Effective expiry: the earlier of the absolute deadline and the end of
    /// the current sliding window.
    pub fn expires_at(&self) -> u64 {
        self.absolute_deadline
            .min(self.last_accessed_at.saturating_add(self.sliding_window_ms))
    }

    /// Remaining lifetime in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at().saturating_sub(now_ms)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: u64 = 60_000;
    const START: u64 = 1_700_000_000_000;

    fn entry() -> CacheEntry<&'static str> {
        CacheEntry::new("value", START, &ExpirationPolicy::default())
    }

    #[test]
    fn test_entry_creation() {
        let entry = entry();

        assert_eq!(entry.value, "value");
        assert_eq!(entry.inserted_at, START);
        assert_eq!(entry.last_accessed_at, START);
        assert_eq!(entry.absolute_deadline, START + 5 * MINUTE);
        assert!(!entry.is_expired(START));
    }

    #[test]
    fn test_sliding_expiry_when_idle() {
        let entry = entry();

        assert!(!entry.is_expired(START + 2 * MINUTE - 1));
        assert!(entry.is_expired(START + 2 * MINUTE));
    }

    #[test]
    fn test_touch_restarts_sliding_window() {
        let mut entry = entry();

        entry.touch(START + 90_000);
        assert!(!entry.is_expired(START + 3 * MINUTE));
        assert!(entry.is_expired(START + 90_000 + 2 * MINUTE));
    }

    #[test]
    fn test_absolute_deadline_wins_over_reads() {
        let mut entry = entry();

        let mut now = START;
        while now < START + 5 * MINUTE - 1_000 {
            now += 1_000;
            entry.touch(now);
            assert!(!entry.is_expired(now));
        }
        assert!(entry.is_expired(START + 5 * MINUTE));
    }

    #[test]
    fn test_expires_at_is_earliest_deadline() {
        let mut entry = entry();
        assert_eq!(entry.expires_at(), START + 2 * MINUTE);

        entry.touch(START + 4 * MINUTE);
        assert_eq!(entry.expires_at(), START + 5 * MINUTE);
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = entry();

        assert_eq!(entry.ttl_remaining_ms(START + MINUTE), MINUTE);
        assert_eq!(entry.ttl_remaining_ms(START + 10 * MINUTE), 0);
    }
}
