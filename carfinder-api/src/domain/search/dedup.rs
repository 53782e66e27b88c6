//! Cross-source deduplication.
//!
//! Two listings are the same vehicle when they share a VIN longer than five
//! characters. Without a usable VIN they are compared on make, model, year
//! and price. The attribute fallback will merge two distinct VIN-less listings that happen
//! to agree on all four fields; that is accepted, and kept as-is because it
//! determines result counts.

use itertools::Itertools;

use super::types::Listing;

/// VINs at or below this length are treated as absent.
const MIN_VIN_LEN: usize = 5;

/// Key deciding whether two listings describe the same vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Vin(String),
    /// make, model, year, price bits
    Attributes(String, String, i32, u64),
}

fn usable_vin(listing: &Listing) -> Option<&str> {
    listing
        .vin
        .as_deref()
        .filter(|vin| vin.len() > MIN_VIN_LEN)
}

pub fn dedup_key(listing: &Listing) -> DedupKey {
    match usable_vin(listing) {
        Some(vin) => DedupKey::Vin(vin.to_string()),
        None => DedupKey::Attributes(
            listing.make.clone(),
            listing.model.clone(),
            listing.year,
            // -0.0 and 0.0 must collide
            (listing.price + 0.0).to_bits(),
        ),
    }
}

/// Pairwise form of [`dedup_key`]: true when [`deduplicate`] would drop one of the two.
pub fn is_duplicate(a: &Listing, b: &Listing) -> bool {
    dedup_key(a) == dedup_key(b)
}

/// Keep the first occurrence of every key, preserving order.
///
/// Callers rank before deduplicating so the retained copy is the preferred one.
pub fn deduplicate<T, F>(items: Vec<T>, listing_of: F) -> Vec<T>
where
    F: Fn(&T) -> &Listing,
{
    items
        .into_iter()
        .unique_by(|item| dedup_key(listing_of(item)))
        .collect()
}
