//! Mock listing source for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::domain::search::traits::{ListingSource, Result, SearchError};
use crate::domain::search::types::{Filters, Listing};

/// In-memory source returning canned listings or a canned failure.
///
/// Clones share listings, failure and the call counter, so a test can keep a handle after moving
/// the source into a registry.
///
/// # Examples
///
/// ```ignore
/// let source = MockSource::returning(vec![listing]).with_delay(Duration::from_millis(50));
/// let broken = MockSource::failing("upstream returned 502");
/// ```
#[derive(Clone)]
pub struct MockSource {
    listings: Arc<RwLock<Vec<Listing>>>,
    failure: Arc<RwLock<Option<String>>>,
    delay: Option<Duration>,
    call_count: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockSource {
    pub fn returning(listings: Vec<Listing>) -> Self {
        Self {
            listings: Arc::new(RwLock::new(listings)),
            failure: Arc::new(RwLock::new(None)),
            delay: None,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn failing(message: impl Into<String>) -> Self {
        let source = Self::empty();
        source.set_failure(Some(message.into()));
        source
    }

    /// Sleep before answering, to exercise timeouts and out-of-order completion.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the listings returned by subsequent calls.
    pub fn set_listings(&self, listings: Vec<Listing>) {
        *self.listings.write().unwrap() = listings;
    }

    /// Make subsequent calls fail with `message`, or succeed again with `None`.
    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.write().unwrap() = message;
    }

    /// Number of times `search` was called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingSource for MockSource {
    async fn search(&self, _filters: &Filters) -> Result<Vec<Listing>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failure.read().unwrap().clone() {
            return Err(SearchError::Source(message));
        }

        Ok(self.listings.read().unwrap().clone())
    }
}
