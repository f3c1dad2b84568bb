//! Cache Store Module
//!
//! Process-local cache engine: a concurrent map of dual-expiration entries.
//! Reads and writes go through the map's own sharded locking, so the store is
//! shared by reference without an outer lock.

use std::sync::Arc;

use dashmap::DashMap;

use crate::cache::{CacheEntry, CacheStats, Clock, ExpirationPolicy, StatsRecorder, SystemClock};

// == Cache Store ==
/// Concurrent cache with absolute and sliding TTL support.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: DashMap<String, CacheEntry<V>>,
    /// TTLs applied to every insertion
    policy: ExpirationPolicy,
    /// Time source for expiry decisions
    clock: Arc<dyn Clock>,
    /// Performance statistics
    stats: StatsRecorder,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a store reading the system clock.
    pub fn new(policy: ExpirationPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Creates a store reading the given clock.
    pub fn with_clock(policy: ExpirationPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
            clock,
            stats: StatsRecorder::new(),
        }
    }

    // == Get ==
    /// Retrieves a live value and restarts its sliding window.
    ///
    /// An expired entry is removed and reported exactly like an absent one.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();

        let found = match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.touch(now);
                Some(entry.value.clone())
            }
            _ => None,
        };

        match found {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                // The guard above is released, so removing here cannot deadlock.
                if self
                    .entries
                    .remove_if(key, |_, entry| entry.is_expired(now))
                    .is_some()
                {
                    self.stats.record_expirations(1);
                }
                self.stats.record_miss();
                None
            }
        }
    }

    // == Insert ==
    /// Stores a value, replacing any previous entry and restarting both TTLs.
    pub fn insert(&self, key: String, value: V) {
        let entry = CacheEntry::new(value, self.clock.now_ms(), &self.policy);
        self.entries.insert(key, entry);
        self.stats.record_insertion();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let expired = entry.is_expired(now);
            if expired {
                removed += 1;
            }
            !expired
        });
        self.stats.record_expirations(removed);
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    pub fn policy(&self) -> ExpirationPolicy {
        self.policy
    }

    // == Length ==
    /// Returns the number of stored entries, including ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
