//! Bounded in-memory cache with per-entry expiry.
//!
//! Used for the two process-wide auth caches: the site-selection cache
//! (token -> cloud ID) and the accessible-resources cache (token -> sites).
//! All operations are synchronous map operations behind a short-lived lock;
//! nothing here awaits.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Default site-selection TTL in seconds (1 hour).
pub const DEFAULT_SITE_CACHE_TTL_SECONDS: u64 = 3600;

/// Default accessible-resources TTL in seconds (5 minutes).
pub const DEFAULT_RESOURCES_CACHE_TTL_SECONDS: u64 = 300;

/// Default capacity for each cache.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

/// Default interval between background sweeps in seconds (5 minutes).
pub const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 300;

/// Cached value with its insertion metadata.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
    /// Position in insertion order, kept across overwrites.
    seq: u64,
}

#[derive(Debug)]
struct Inner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    /// seq -> key, oldest first.
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl<T> Inner<T> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }
}

/// Thread-safe TTL cache keyed by string.
///
/// Expiry is enforced lazily on [`get`](Self::get) and eagerly by
/// [`cleanup`](Self::cleanup). When full, inserting a new key evicts the
/// oldest-inserted entry; overwriting an existing key never evicts.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    max_size: usize,
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> TtlCache<T> {
    /// Create a new cache. A `max_size` of zero is treated as one.
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size: max_size.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Configured capacity.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn is_expired(&self, entry: &CacheEntry<T>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) > self.ttl
    }

    /// Return the cached value if present and unexpired.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        match inner.entries.get(key) {
            None => return None,
            Some(entry) if !self.is_expired(entry, now) => return Some(entry.value.clone()),
            Some(_) => {}
        }

        inner.remove(key);
        None
    }

    /// Insert or overwrite `key` with a fresh timestamp.
    pub fn set(&self, key: impl Into<String>, value: T) {
        let key = key.into();
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.value = value;
            entry.inserted_at = now;
            return;
        }

        if inner.entries.len() >= self.max_size {
            if let Some((_, oldest)) = inner.order.pop_first() {
                inner.entries.remove(&oldest);
                debug!(capacity = self.max_size, "TTL cache full, evicted oldest entry");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                seq,
            },
        );
    }

    /// Remove `key`, returning its value if it was present (expired or not).
    pub fn remove(&self, key: &str) -> Option<T> {
        self.inner.lock().remove(key).map(|e| e.value)
    }

    /// Delete every expired entry. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let stale: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            inner.remove(key);
        }
        stale.len()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Return `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

impl<T: Clone + Send + 'static> TtlCache<T> {
    /// Run [`cleanup`](Self::cleanup) every `every` on the tokio runtime.
    ///
    /// The task holds a weak reference and exits once the cache is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>, name: &'static str, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // First tick fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    debug!(cache = name, "Cache dropped, stopping cleanup task");
                    break;
                };
                let removed = cache.cleanup();
                if removed > 0 {
                    debug!(cache = name, removed, "Swept expired cache entries");
                }
            }
        })
    }
}
