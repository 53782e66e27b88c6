//! Predicate evaluation of [`Filters`] against a [`Listing`].

use super::types::{Filters, Listing};

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

fn text_matches(field: &str, wanted: Option<&String>) -> bool {
    wanted.map_or(true, |w| contains_ignore_case(field, w))
}

fn in_range<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

impl Filters {
    /// Whether `listing` satisfies every predicate set on these filters.
    ///
    /// `source` and `sort_by` are not predicates and are ignored here.
    pub fn matches(&self, listing: &Listing) -> bool {
        text_matches(&listing.make, self.make.as_ref())
            && text_matches(&listing.model, self.model.as_ref())
            && text_matches(&listing.fuel_type, self.fuel_type.as_ref())
            && text_matches(&listing.transmission, self.transmission.as_ref())
            && text_matches(&listing.exterior_color, self.exterior_color.as_ref())
            && text_matches(&listing.interior_color, self.interior_color.as_ref())
            && in_range(listing.year, self.year_min, self.year_max)
            && in_range(listing.price, self.price_min, self.price_max)
            && in_range(listing.mileage, self.mileage_min, self.mileage_max)
            && self.body_type_matches(listing)
            && self.features_match(listing)
            && self.query_matches(listing)
    }

    fn body_type_matches(&self, listing: &Listing) -> bool {
        let Some(wanted) = self.body_type.as_deref() else {
            return true;
        };

        match listing.body_type.as_deref() {
            Some(body_type) => body_type.eq_ignore_ascii_case(wanted.trim()),
            // Sources without a body-type field: fall back to the free text
            None => {
                contains_ignore_case(&listing.model, wanted)
                    || contains_ignore_case(&listing.description, wanted)
            }
        }
    }

    fn features_match(&self, listing: &Listing) -> bool {
        self.features.iter().all(|wanted| {
            listing
                .features
                .iter()
                .any(|feature| contains_ignore_case(feature, wanted))
        })
    }

    fn query_matches(&self, listing: &Listing) -> bool {
        let Some(query) = self.query.as_deref() else {
            return true;
        };

        let haystack = format!(
            "{} {} {} {}",
            listing.make, listing.model, listing.year, listing.description
        )
        .to_lowercase();

        query
            .split_whitespace()
            .all(|term| haystack.contains(&term.to_lowercase()))
    }
}
