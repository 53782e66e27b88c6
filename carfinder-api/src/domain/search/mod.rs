//! Vehicle search - one query fanned out over every configured listing source.
//!
//! A search runs through these stages:
//! - **Fan-out**: one task per enabled source, each bounded by a timeout
//! - **Merge**: per-source filtering, then ranking by source priority and price
//! - **Dedup**: by VIN when present, else by make, model, year and price
//!
//! # Architecture
//!
//! The search system is built around trait abstractions for testability:
//!
//! - [`ListingSource`] - A listing provider (JSON catalog, marketplace API, mocks)
//! - [`QueryExpander`] - Optional AI rewrite of slang before rule matching
//!
//! # Example
//!
//! ```ignore
//! use carfinder_api::domain::search::{Aggregator, AggregatorConfig, SourceRegistry, VehicleSearch};
//!
//! let registry = Arc::new(SourceRegistry::new(descriptors)?);
//! let aggregator = Aggregator::new(registry, AggregatorConfig::default());
//! let service = VehicleSearch::new(aggregator, QueryNormalizer::new(names), DEFAULT_TTL);
//!
//! let outcome = service.search(&Filters::default()).await?;
//! ```
//!
//! # Query Syntax
//!
//! Free text is normalized into filters before searching:
//!
//! - `"SUV under 40k"` → body_type: SUV, price_max: 40000
//! - `"chevy truck 2018 2021"` → make: Chevrolet, body_type: Truck, years 2018..=2021
//! - `"civic from marketplace"` → source: marketplace, query: "civic"
//!
//! See [`parse_query`] for the full rule set.

mod aggregator;
mod cache;
mod dedup;
mod filter;
mod normalizer;
mod ranking;
mod registry;
mod service;
mod traits;
mod types;

pub mod expander;
pub mod source;

pub use aggregator::{Aggregator, AggregatorConfig};
pub use cache::{Clock, ResultCache, SystemClock, DEFAULT_TTL};
pub use dedup::{dedup_key, deduplicate, is_duplicate, DedupKey};
pub use normalizer::{parse_query, NormalizedQuery, QueryNormalizer, RECENT_ERA_THRESHOLD};
pub use registry::{SourceDescriptor, SourceInfo, SourceRegistry};
pub use service::{TextSearch, VehicleSearch, ALL_VEHICLES_KEY};
pub use traits::{ListingSource, QueryExpander, Result, SearchError};
#[cfg(test)]
pub(crate) use types::fixtures;
pub use types::{
    Filters, Listing, SearchOutcome, SortBy, SortDirection, SortField, SourceStatus,
};
