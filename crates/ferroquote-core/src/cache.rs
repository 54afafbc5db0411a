//! In-memory TTL cache of the last successful quote per symbol.
//!
//! Staleness is computed lazily on read: an entry older than the TTL is
//! reported as absent but stays in the map until the next successful fetch
//! overwrites it (or [`QuoteCache::purge_stale`] is called explicitly).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::{Quote, Symbol};

/// Freshness window used when none is configured.
pub const DEFAULT_QUOTE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    quote: Quote,
    fetched_at: OffsetDateTime,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<Symbol, CacheEntry>,
    ttl: time::Duration,
}

impl CacheInner {
    fn new(ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            ttl: time::Duration::try_from(ttl).unwrap_or(time::Duration::MAX),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: OffsetDateTime) -> bool {
        now - entry.fetched_at < self.ttl
    }

    fn get(&self, symbol: &Symbol, now: OffsetDateTime) -> Option<Quote> {
        self.map.get(symbol).and_then(|entry| {
            if self.is_fresh(entry, now) {
                Some(entry.quote.clone())
            } else {
                None
            }
        })
    }

    fn put(&mut self, symbol: Symbol, quote: Quote, now: OffsetDateTime) {
        self.map.insert(
            symbol,
            CacheEntry {
                quote,
                fetched_at: now,
            },
        );
    }

    fn purge_stale(&mut self, now: OffsetDateTime) -> usize {
        let before = self.map.len();
        let ttl = self.ttl;
        self.map.retain(|_, entry| now - entry.fetched_at < ttl);
        before - self.map.len()
    }
}

/// Thread-safe quote cache keyed by symbol.
///
/// Cloning is cheap and shares the underlying map.
#[derive(Debug, Clone)]
pub struct QuoteCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
    clock: Arc<dyn Clock>,
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTE_TTL)
    }
}

impl QuoteCache {
    /// Create a cache with the given freshness window on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(ttl))),
            clock,
        }
    }

    /// Returns the cached quote if present and younger than the TTL.
    pub async fn get(&self, symbol: &Symbol) -> Option<Quote> {
        let store = self.inner.read().await;
        let hit = store.get(symbol, self.clock.now());
        if hit.is_some() {
            debug!(symbol = %symbol, "quote cache hit");
        }
        hit
    }

    /// Stores (or overwrites) the quote for `symbol`, stamped with the current time.
    pub async fn put(&self, symbol: Symbol, quote: Quote) {
        let mut store = self.inner.write().await;
        store.put(symbol, quote, self.clock.now());
    }

    /// Removes entries older than the TTL. Returns the number removed.
    pub async fn purge_stale(&self) -> usize {
        let mut store = self.inner.write().await;
        store.purge_stale(self.clock.now())
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    /// Number of stored entries, stale ones included.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
