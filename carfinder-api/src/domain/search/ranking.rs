//! Result ordering.

use std::cmp::Ordering;

use super::types::{Listing, SortBy, SortDirection, SortField};

/// A listing tagged with the priority of the source that produced it.
///
/// The tag only lives inside the aggregation pipeline.
#[derive(Debug, Clone)]
pub(crate) struct Ranked {
    pub listing: Listing,
    pub priority: i32,
}

/// Stable sort by source priority (descending), then price (ascending).
pub(crate) fn rank(items: &mut [Ranked]) {
    items.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.listing.price.total_cmp(&b.listing.price))
    });
}

/// Stable sort by an explicit caller-requested field. Existing order breaks ties.
pub fn apply_sort(listings: &mut [Listing], sort: SortBy) {
    listings.sort_by(|a, b| {
        let ordering = compare_field(a, b, sort.field);
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn compare_field(a: &Listing, b: &Listing, field: SortField) -> Ordering {
    match field {
        SortField::Price => a.price.total_cmp(&b.price),
        SortField::Year => a.year.cmp(&b.year),
        SortField::Mileage => a.mileage.cmp(&b.mileage),
        SortField::ListingDate => a.listing_date.cmp(&b.listing_date),
    }
}
