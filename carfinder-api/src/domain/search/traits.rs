//! Trait definitions for search domain abstractions.
//!
//! These traits enable dependency injection and easy testing through mocking.

use async_trait::async_trait;

use super::types::{Filters, Listing};

/// Error type for search operations.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Source error: {0}")]
    Source(String),

    #[error("Source timed out after {0} ms")]
    Timeout(u64),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Unknown or disabled source: {0}")]
    UnknownSource(String),

    #[error("Query expansion failed: {0}")]
    Expansion(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid listing {id}: {reason}")]
    InvalidListing { id: String, reason: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SearchError {
    /// Errors that make the whole request unanswerable, as opposed to one source failing.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SearchError::Registry(_) | SearchError::UnknownSource(_))
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// One upstream listing provider.
///
/// Implementations own their fetch and parse logic. The aggregator only ever
/// sees this signature, so an adapter is free to ignore filters it cannot
/// push down; results are filtered again after collection.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch listings matching `filters` as closely as the provider allows.
    async fn search(&self, filters: &Filters) -> Result<Vec<Listing>>;
}

/// Rewrites slang and abbreviations in a raw query into plain text.
///
/// # Example
///
/// ```ignore
/// let expander = OpenAiExpander::new(settings)?;
/// let text = expander.expand("e46 m3 under 20k").await?;
/// assert!(text.contains("BMW"));
/// ```
#[async_trait]
pub trait QueryExpander: Send + Sync {
    async fn expand(&self, raw: &str) -> Result<String>;
}
