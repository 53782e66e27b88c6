//! Short-TTL memoization in front of the aggregator.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Default lifetime of a cached aggregation.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Time source, injectable so tests can move time by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    fetched_at: Instant,
}

/// Single entry per key, refreshed at most once per TTL window.
///
/// Reads take a shared lock. Refreshes are serialized by a separate mutex so
/// concurrent misses for the same window trigger one fetch. When a refresh
/// fails the previous value is served even if it has expired.
///
/// # Example
///
/// ```ignore
/// let cache = ResultCache::new(DEFAULT_TTL);
/// let outcome = cache
///     .get_or_fetch("all", || aggregator.aggregate_search(&Filters::default()))
///     .await?;
/// ```
pub struct ResultCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, Entry<T>>>,
    refresh: Mutex<()>,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
            refresh: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value for `key` while it is fresh, otherwise call `fetch`.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if let Some(value) = self.fresh(key).await {
            debug!(key, "cache hit");
            return Ok(value);
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(value) = self.fresh(key).await {
            debug!(key, "cache hit after wait");
            return Ok(value);
        }

        match fetch().await {
            Ok(value) => {
                let fetched_at = self.clock.now();
                self.entries.write().await.insert(
                    key.to_string(),
                    Entry {
                        value: value.clone(),
                        fetched_at,
                    },
                );
                debug!(key, "cache refreshed");
                Ok(value)
            }
            Err(err) => match self.entries.read().await.get(key) {
                Some(stale) => {
                    warn!(key, error = %err, "cache refresh failed, serving stale value");
                    Ok(stale.value.clone())
                }
                None => Err(err),
            },
        }
    }

    /// Drop the entry for `key`, forcing the next call to fetch.
    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    async fn fresh(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.fetched_at) < self.ttl)
            .map(|entry| entry.value.clone())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        pub fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }
}
