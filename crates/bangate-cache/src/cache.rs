//! Expiring key→value cache with lazy eviction.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One cached value plus its absolute expiry deadline.
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A thread-safe key→value cache where every entry expires `ttl` after it
/// was written.
///
/// ## Expiry model
///
/// Expiry is ABSOLUTE and LAZY: an entry is logically absent the moment
/// `now > expires_at`, regardless of whether it has been physically
/// removed. [`get`](Self::get) drops expired entries as it finds them —
/// there is no background sweeper. This is fine for the gate's workload:
/// the key population is bounded by the number of concurrently-tracked
/// players, so unswept garbage is small and short-lived.
///
/// ## Concurrency
///
/// All operations take the interior mutex for a few instructions and
/// return; multiple decision pipelines can call in concurrently without
/// external locking. `Instant` is the monotonic clock — unaffected by
/// system clock changes, which matters because a wall-clock jump must not
/// mass-expire (or mass-revive) ban verdicts.
#[derive(Debug)]
pub struct ExpiringCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Creates an empty cache whose entries live for `ttl` after each
    /// write.
    ///
    /// The TTL is taken as-is. Callers are expected to clamp configured
    /// values to a sane minimum before constructing the cache; a zero TTL
    /// yields instant expiry (useful in tests, useless in production).
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Looks up `key`. Returns `None` if no entry exists or the entry has
    /// expired; an expired entry is physically removed on the way out.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.expires_at >= Instant::now() => {
                Some(entry.value.clone())
            }
            Some(_) => {
                // Lazy eviction: the entry is logically gone, drop it now
                // so the map doesn't accumulate corpses.
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Inserts or overwrites `key`, resetting its deadline to `now + ttl`.
    pub fn set(&self, key: K, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, entry);
    }

    /// Removes `key` if present. No-op otherwise.
    pub fn remove(&self, key: &K) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    /// Drops every entry. Running pipelines observe this only as a future
    /// cache miss.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = entries.len();
        entries.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "cache cleared");
        }
    }

    /// Number of physically present entries (expired-but-unswept ones
    /// included).
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// `true` when no entries are physically present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The construction-time TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
