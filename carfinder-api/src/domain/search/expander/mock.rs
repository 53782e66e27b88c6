//! Mock query expander for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::domain::search::traits::{QueryExpander, Result, SearchError};

/// Expander returning a fixed text or a fixed failure.
#[derive(Clone)]
pub struct MockExpander {
    response: std::result::Result<String, String>,
    call_count: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockExpander {
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryExpander for MockExpander {
    async fn expand(&self, _raw: &str) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .map_err(SearchError::Expansion)
    }
}
