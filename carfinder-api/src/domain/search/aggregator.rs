//! Concurrent fan-out over every enabled source, then merge, rank and dedup.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use super::dedup::deduplicate;
use super::ranking::{apply_sort, rank, Ranked};
use super::registry::{SourceDescriptor, SourceRegistry};
use super::traits::{Result, SearchError};
use super::types::{Filters, Listing, SearchOutcome, SourceStatus};

/// Configuration for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Upper bound for a single source call
    pub source_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(8),
        }
    }
}

/// Aggregates listings across a [`SourceRegistry`].
///
/// Every call is an independent run: dispatch one task per source, wait for
/// all of them, then merge, rank and deduplicate. A failing or slow source
/// contributes nothing and is reported in [`SearchOutcome::per_source`]; it
/// never fails the request.
///
/// # Example
///
/// ```ignore
/// let aggregator = Aggregator::new(Arc::new(registry), AggregatorConfig::default());
/// let outcome = aggregator.aggregate_search(&Filters::default()).await?;
/// println!("{} listings from {} sources", outcome.results.len(), outcome.sources_enabled);
/// ```
#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(registry: Arc<SourceRegistry>, config: AggregatorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Run one aggregated search.
    ///
    /// Fails only when there is nothing to query: no enabled sources, or a
    /// `source` restriction naming an unknown or disabled source.
    #[instrument(skip_all, fields(filtered = !filters.is_empty()))]
    pub async fn aggregate_search(&self, filters: &Filters) -> Result<SearchOutcome> {
        let targets = self.targets(filters)?;

        // Dispatch: every task is spawned before any is awaited.
        let tasks = targets
            .iter()
            .map(|descriptor| {
                let source = Arc::clone(&descriptor.source);
                let filters = filters.clone();
                let timeout = self.config.source_timeout;
                tokio::spawn(async move {
                    tokio::time::timeout(timeout, async move { source.search(&filters).await })
                        .await
                })
            })
            .collect::<Vec<_>>();

        // Collect
        let joined = join_all(tasks).await;

        let mut merged: Vec<Ranked> = Vec::new();
        let mut per_source = Vec::with_capacity(targets.len());

        for (descriptor, outcome) in targets.iter().zip(joined) {
            let result = match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(_elapsed)) => Err(SearchError::Timeout(
                    self.config.source_timeout.as_millis() as u64,
                )),
                Err(join_error) => Err(SearchError::Source(format!(
                    "source task failed: {join_error}"
                ))),
            };

            match result {
                Ok(listings) => {
                    let accepted = accept(descriptor, listings, filters);
                    debug!(source = %descriptor.name, count = accepted.len(), "source returned listings");
                    per_source.push(SourceStatus {
                        name: descriptor.name.clone(),
                        count: accepted.len(),
                        error: None,
                    });
                    // Merge
                    merged.extend(accepted.into_iter().map(|listing| Ranked {
                        listing,
                        priority: descriptor.priority,
                    }));
                }
                Err(err) => {
                    warn!(source = %descriptor.name, error = %err, "source search failed");
                    per_source.push(SourceStatus {
                        name: descriptor.name.clone(),
                        count: 0,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        // Rank before dedup so the surviving copy is the preferred one.
        let merged_count = merged.len();
        rank(&mut merged);
        let mut results: Vec<Listing> = deduplicate(merged, |r| &r.listing)
            .into_iter()
            .map(|r| r.listing)
            .collect();

        if let Some(sort) = filters.sort_by {
            apply_sort(&mut results, sort);
        }

        info!(
            sources = per_source.len(),
            failed = per_source.iter().filter(|s| !s.succeeded()).count(),
            merged = merged_count,
            results = results.len(),
            "aggregated search completed"
        );

        Ok(SearchOutcome {
            results,
            per_source,
            sources_total: self.registry.total(),
            sources_enabled: self.registry.enabled_count(),
        })
    }

    fn targets(&self, filters: &Filters) -> Result<Vec<&SourceDescriptor>> {
        if let Some(name) = filters.source.as_deref() {
            return match self.registry.get(name) {
                Some(descriptor) if descriptor.enabled => Ok(vec![descriptor]),
                _ => Err(SearchError::UnknownSource(name.to_string())),
            };
        }

        let enabled = self.registry.enabled();
        if enabled.is_empty() {
            return Err(SearchError::Registry("no enabled sources".into()));
        }
        Ok(enabled)
    }
}

/// Apply the request filters to one source's results and stamp its name.
fn accept(descriptor: &SourceDescriptor, listings: Vec<Listing>, filters: &Filters) -> Vec<Listing> {
    listings
        .into_iter()
        .filter(|listing| filters.matches(listing))
        .map(|mut listing| {
            if listing.source_name.is_empty() {
                listing.source_name = descriptor.name.clone();
            }
            listing
        })
        .collect()
}
