//! Curated catalog source backed by a JSON file.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use super::validated;
use crate::domain::search::traits::{ListingSource, Result, SearchError};
use crate::domain::search::types::{Filters, Listing};

/// Hand-curated listings loaded once at startup.
///
/// The file holds a JSON array of listings in the canonical camelCase shape.
/// Entries that fail validation are dropped with a warning.
///
/// # Example
///
/// ```ignore
/// let catalog = CatalogSource::load("config/catalog.json", "catalog").await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogSource {
    listings: Vec<Listing>,
}

impl CatalogSource {
    pub async fn load(path: impl AsRef<Path>, source_name: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            SearchError::Config(format!("failed to read catalog {}: {e}", path.display()))
        })?;
        let catalog = Self::from_json(&content, source_name)?;

        info!(
            path = %path.display(),
            listings = catalog.len(),
            "Loaded curated catalog"
        );
        Ok(catalog)
    }

    pub fn from_json(content: &str, source_name: &str) -> Result<Self> {
        let listings: Vec<Listing> = serde_json::from_str(content)?;
        Ok(Self::from_listings(listings, source_name))
    }

    pub fn from_listings(listings: Vec<Listing>, source_name: &str) -> Self {
        let listings = validated(source_name, listings)
            .into_iter()
            .map(|mut listing| {
                listing.source_name = source_name.to_string();
                listing
            })
            .collect();
        Self { listings }
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[async_trait]
impl ListingSource for CatalogSource {
    async fn search(&self, filters: &Filters) -> Result<Vec<Listing>> {
        Ok(self
            .listings
            .iter()
            .filter(|listing| filters.matches(listing))
            .cloned()
            .collect())
    }
}
