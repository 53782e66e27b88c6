//! Public entry points: structured search, free-text search and lookup by id.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument};

use super::aggregator::Aggregator;
use super::cache::ResultCache;
use super::normalizer::{NormalizedQuery, QueryNormalizer};
use super::registry::SourceInfo;
use super::traits::{Result, SearchError};
use super::types::{Filters, Listing, SearchOutcome};

/// Cache key for the unfiltered "all vehicles" aggregation.
pub const ALL_VEHICLES_KEY: &str = "all_vehicles";

/// Outcome of a free-text search together with how the text was read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSearch {
    #[serde(flatten)]
    pub outcome: SearchOutcome,
    pub interpreted: NormalizedQuery,
}

/// Vehicle search service that ties the aggregator, the result cache and the
/// query normalizer together.
///
/// Only the empty-filter query goes through the cache. Everything else is a
/// fresh fan-out.
///
/// # Examples
///
/// ```ignore
/// let service = VehicleSearch::new(aggregator, normalizer, DEFAULT_TTL);
/// let outcome = service.search(&Filters::default()).await?;
/// let found = service.get_by_id("cat-42").await?;
/// ```
#[derive(Clone)]
pub struct VehicleSearch {
    aggregator: Aggregator,
    cache: Arc<ResultCache<SearchOutcome>>,
    normalizer: QueryNormalizer,
}

impl VehicleSearch {
    pub fn new(aggregator: Aggregator, normalizer: QueryNormalizer, cache_ttl: Duration) -> Self {
        Self::with_cache(aggregator, normalizer, ResultCache::new(cache_ttl))
    }

    pub fn with_cache(
        aggregator: Aggregator,
        normalizer: QueryNormalizer,
        cache: ResultCache<SearchOutcome>,
    ) -> Self {
        Self {
            aggregator,
            cache: Arc::new(cache),
            normalizer,
        }
    }

    /// Search with structured filters.
    ///
    /// An unfiltered aggregation where every source failed is not cached: the
    /// previous entry is served if there is one, otherwise the failed outcome.
    pub async fn search(&self, filters: &Filters) -> Result<SearchOutcome> {
        if !filters.is_empty() {
            return self.aggregator.aggregate_search(filters).await;
        }

        let mut failed = None;
        let failed_slot = &mut failed;
        let result = self
            .cache
            .get_or_fetch(ALL_VEHICLES_KEY, move || async move {
                let outcome = self.aggregator.aggregate_search(filters).await?;
                if outcome.all_failed() {
                    let err = SearchError::Source(format!(
                        "all {} sources failed",
                        outcome.per_source.len()
                    ));
                    *failed_slot = Some(outcome);
                    return Err(err);
                }
                Ok(outcome)
            })
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => failed.take().ok_or(err),
        }
    }

    /// Normalize a free-text query, then search with the resulting filters.
    ///
    /// Text the normalizer could not interpret becomes the free-text `query`
    /// filter, so "toyota camry hybrid" still narrows on "camry".
    #[instrument(skip(self))]
    pub async fn search_text(&self, raw: &str) -> Result<TextSearch> {
        let interpreted = self.normalizer.normalize(raw).await;

        let mut filters = interpreted.filters.clone();
        if filters.query.is_none() && !interpreted.cleaned_text.is_empty() {
            filters.query = Some(interpreted.cleaned_text.clone());
        }
        debug!(?filters, "Interpreted query");

        let outcome = self.search(&filters).await?;
        Ok(TextSearch {
            outcome,
            interpreted,
        })
    }

    /// Find a listing by id.
    ///
    /// Sources have no uniform by-id lookup, so this scans the unfiltered
    /// (cached) aggregation.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Listing>> {
        let outcome = self.search(&Filters::default()).await?;
        Ok(outcome.results.into_iter().find(|listing| listing.id == id))
    }

    pub async fn normalize(&self, raw: &str) -> NormalizedQuery {
        self.normalizer.normalize(raw).await
    }

    pub fn sources(&self) -> Vec<SourceInfo> {
        self.aggregator.registry().infos()
    }

    /// Drop the cached unfiltered aggregation.
    pub async fn invalidate_cache(&self) {
        self.cache.invalidate(ALL_VEHICLES_KEY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search::aggregator::AggregatorConfig;
    use crate::domain::search::cache::testing::ManualClock;
    use crate::domain::search::registry::{SourceDescriptor, SourceRegistry};
    use crate::domain::search::source::MockSource;
    use crate::domain::search::types::fixtures::listing;

    const TTL: Duration = Duration::from_secs(300);

    fn service_with_clock(
        descriptors: Vec<SourceDescriptor>,
        clock: Arc<ManualClock>,
    ) -> VehicleSearch {
        let registry = Arc::new(SourceRegistry::new(descriptors).unwrap());
        let names = registry.infos().into_iter().map(|info| info.name).collect();
        let aggregator = Aggregator::new(
            registry,
            AggregatorConfig {
                source_timeout: Duration::from_millis(500),
            },
        );
        VehicleSearch::with_cache(
            aggregator,
            QueryNormalizer::new(names),
            ResultCache::with_clock(TTL, clock),
        )
    }

    fn service(descriptors: Vec<SourceDescriptor>) -> VehicleSearch {
        service_with_clock(descriptors, Arc::new(ManualClock::new()))
    }

    #[tokio::test]
    async fn empty_filters_are_cached_within_ttl() {
        let clock = Arc::new(ManualClock::new());
        let source = MockSource::returning(vec![listing("a", "Honda", "Civic", 2019, 18_000.0)]);
        let service = service_with_clock(
            vec![SourceDescriptor::new("catalog", 10, source.clone())],
            clock.clone(),
        );

        service.search(&Filters::default()).await.unwrap();
        service.search(&Filters::default()).await.unwrap();
        assert_eq!(source.call_count(), 1);

        clock.advance(TTL + Duration::from_secs(1));
        service.search(&Filters::default()).await.unwrap();
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn stale_listings_survive_full_outage() {
        let clock = Arc::new(ManualClock::new());
        let catalog = MockSource::returning(vec![listing("a", "Honda", "Civic", 2019, 18_000.0)]);
        let marketplace = MockSource::returning(vec![listing("b", "Mazda", "CX-5", 2021, 27_000.0)]);
        let service = service_with_clock(
            vec![
                SourceDescriptor::new("catalog", 10, catalog.clone()),
                SourceDescriptor::new("marketplace", 5, marketplace.clone()),
            ],
            clock.clone(),
        );

        let fresh = service.search(&Filters::default()).await.unwrap();
        assert_eq!(fresh.results.len(), 2);

        clock.advance(TTL + Duration::from_secs(1));
        catalog.set_failure(Some("upstream 502".to_string()));
        marketplace.set_failure(Some("connection reset".to_string()));

        let outcome = service.search(&Filters::default()).await.unwrap();
        assert_eq!(outcome, fresh);
        assert_eq!(catalog.call_count(), 2);

        // The failed aggregation did not replace the entry.
        catalog.set_failure(None);
        marketplace.set_failure(None);
        clock.advance(TTL + Duration::from_secs(1));
        assert_eq!(service.search(&Filters::default()).await.unwrap().results.len(), 2);
    }

    #[tokio::test]
    async fn full_outage_without_cache_returns_failed_outcome() {
        let source = MockSource::failing("upstream 502");
        let service = service(vec![SourceDescriptor::new("catalog", 10, source.clone())]);

        let outcome = service.search(&Filters::default()).await.unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.all_failed());

        // Nothing was cached, so the next call fans out again.
        source.set_failure(None);
        service.search(&Filters::default()).await.unwrap();
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn filtered_searches_bypass_cache() {
        let source = MockSource::returning(vec![listing("a", "Honda", "Civic", 2019, 18_000.0)]);
        let service = service(vec![SourceDescriptor::new("catalog", 10, source.clone())]);
        let filters = Filters {
            make: Some("honda".to_string()),
            ..Default::default()
        };

        service.search(&filters).await.unwrap();
        service.search(&filters).await.unwrap();
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn invalidate_cache_forces_refetch() {
        let source = MockSource::empty();
        let service = service(vec![SourceDescriptor::new("catalog", 10, source.clone())]);

        service.search(&Filters::default()).await.unwrap();
        service.invalidate_cache().await;
        service.search(&Filters::default()).await.unwrap();
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn get_by_id_scans_unfiltered_results() {
        let source = MockSource::returning(vec![
            listing("a", "Honda", "Civic", 2019, 18_000.0),
            listing("b", "Mazda", "CX-5", 2021, 27_000.0),
        ]);
        let service = service(vec![SourceDescriptor::new("catalog", 10, source.clone())]);

        let found = service.get_by_id("b").await.unwrap();
        assert_eq!(found.map(|l| l.model), Some("CX-5".to_string()));
        assert!(service.get_by_id("zzz").await.unwrap().is_none());

        // Second lookup is served from the cache.
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn get_by_id_propagates_registry_errors() {
        let service = service(vec![
            SourceDescriptor::new("catalog", 10, MockSource::empty()).disabled()
        ]);
        assert!(service.get_by_id("a").await.is_err());
    }

    #[tokio::test]
    async fn search_text_applies_interpreted_filters() {
        let source = MockSource::returning(vec![
            listing("a", "Toyota", "Camry", 2020, 25_000.0),
            listing("b", "Toyota", "Highlander", 2021, 38_000.0),
            listing("c", "Honda", "Accord", 2020, 24_000.0),
        ]);
        let service = service(vec![SourceDescriptor::new("catalog", 10, source)]);

        let found = service.search_text("toyota under 30k").await.unwrap();
        assert_eq!(found.interpreted.filters.make.as_deref(), Some("Toyota"));
        assert_eq!(found.interpreted.filters.price_max, Some(30_000.0));
        let ids: Vec<_> = found.outcome.results.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn search_text_uses_leftover_text_as_query() {
        let source = MockSource::returning(vec![
            listing("a", "Toyota", "Camry", 2020, 25_000.0),
            listing("b", "Toyota", "Corolla", 2020, 21_000.0),
        ]);
        let service = service(vec![SourceDescriptor::new("catalog", 10, source)]);

        let found = service.search_text("toyota camry").await.unwrap();
        assert_eq!(found.interpreted.cleaned_text, "camry");
        assert!(found.interpreted.filters.query.is_none());
        let ids: Vec<_> = found.outcome.results.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn search_text_honors_source_hint() {
        let service = service(vec![
            SourceDescriptor::new(
                "catalog",
                10,
                MockSource::returning(vec![listing("a", "Ford", "Focus", 2016, 9_000.0)]),
            ),
            SourceDescriptor::new(
                "marketplace",
                5,
                MockSource::returning(vec![listing("b", "Ford", "Fiesta", 2017, 8_000.0)]),
            ),
        ]);

        let found = service.search_text("ford from marketplace").await.unwrap();
        assert_eq!(found.outcome.per_source.len(), 1);
        assert_eq!(found.outcome.per_source[0].name, "marketplace");
        assert_eq!(found.outcome.results[0].id, "b");
    }

    #[tokio::test]
    async fn sources_lists_registry() {
        let service = service(vec![
            SourceDescriptor::new("catalog", 10, MockSource::empty()),
            SourceDescriptor::new("marketplace", 5, MockSource::empty()).disabled(),
        ]);

        let sources = service.sources();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].enabled);
        assert!(!sources[1].enabled);
    }

    #[test]
    fn text_search_serializes_flat() {
        let result = TextSearch {
            outcome: SearchOutcome {
                results: vec![],
                per_source: vec![],
                sources_total: 1,
                sources_enabled: 1,
            },
            interpreted: NormalizedQuery::default(),
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["sourcesTotal"], 1);
        assert!(json.get("interpreted").is_some());
    }
}
