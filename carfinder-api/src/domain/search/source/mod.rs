//! Listing source implementations.

mod catalog;
mod marketplace;
#[cfg(test)]
mod mock;

pub use catalog::CatalogSource;
pub use marketplace::MarketplaceSource;
#[cfg(test)]
pub use mock::MockSource;

use tracing::warn;

use super::types::Listing;

/// Drop listings that violate the canonical invariants.
pub(crate) fn validated(source_name: &str, listings: Vec<Listing>) -> Vec<Listing> {
    listings
        .into_iter()
        .filter(|listing| match listing.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(source = source_name, error = %e, "Dropping invalid listing");
                false
            }
        })
        .collect()
}
