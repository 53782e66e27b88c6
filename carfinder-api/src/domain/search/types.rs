//! Core types for the vehicle search domain.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::traits::{Result, SearchError};

/// Earliest model year accepted from any source.
pub const MIN_MODEL_YEAR: i32 = 1900;

/// A vehicle listing in the canonical shape every source produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Source-local or globally unique identifier
    pub id: String,
    /// Vehicle identification number, best dedup key when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    /// Asking price in USD
    pub price: f64,
    pub mileage: u32,
    #[serde(default)]
    pub exterior_color: String,
    #[serde(default)]
    pub interior_color: String,
    #[serde(default)]
    pub fuel_type: String,
    #[serde(default)]
    pub transmission: String,
    #[serde(default)]
    pub engine: String,
    /// Body style such as "SUV" or "Sedan", when the source reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    /// Image URLs, the first one is the primary image
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub dealer: String,
    pub listing_date: NaiveDate,
    /// Name of the source that produced this listing
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub url: String,
}

impl Listing {
    /// Check the invariants every listing must satisfy before it reaches the aggregator.
    pub fn validate(&self) -> Result<()> {
        if self.make.trim().is_empty() || self.model.trim().is_empty() {
            return Err(SearchError::InvalidListing {
                id: self.id.clone(),
                reason: "missing make or model".to_string(),
            });
        }

        let max_year = Utc::now().year() + 1;
        if !(MIN_MODEL_YEAR..=max_year).contains(&self.year) {
            return Err(SearchError::InvalidListing {
                id: self.id.clone(),
                reason: format!("implausible year {}", self.year),
            });
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(SearchError::InvalidListing {
                id: self.id.clone(),
                reason: format!("invalid price {}", self.price),
            });
        }

        Ok(())
    }

    /// Primary image, if any.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Field a result list can be explicitly sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum SortField {
    Price,
    Year,
    Mileage,
    ListingDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Explicit sort requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: SortField,
    pub direction: SortDirection,
}

impl std::str::FromStr for SortBy {
    type Err = SearchError;

    /// Parse `"price"`, `"price:desc"` or `"listingDate:asc"`.
    fn from_str(s: &str) -> Result<Self> {
        let (field, direction) = match s.split_once(':') {
            Some((field, direction)) => (field, Some(direction)),
            None => (s, None),
        };

        let field = field
            .trim()
            .parse::<SortField>()
            .map_err(|_| SearchError::InvalidFilter(format!("unknown sort field '{field}'")))?;
        let direction = match direction {
            Some(d) => d
                .trim()
                .parse::<SortDirection>()
                .map_err(|_| SearchError::InvalidFilter(format!("unknown sort direction '{d}'")))?,
            None => SortDirection::default(),
        };

        Ok(Self { field, direction })
    }
}

/// Sparse set of optional predicates. The default value matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exterior_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interior_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    /// All of these must be present on a listing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    /// Free text matched against make, model, year and description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    /// Restrict fan-out to this one source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Filters {
    /// True when no predicate, sort or source restriction is set.
    pub fn is_empty(&self) -> bool {
        *self == Filters::default()
    }
}

/// Per-source status line in a [`SearchOutcome`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub name: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceStatus {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of one aggregated search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    /// Deduplicated, ranked listings
    pub results: Vec<Listing>,
    /// One entry per queried source, in registry order
    pub per_source: Vec<SourceStatus>,
    pub sources_total: usize,
    pub sources_enabled: usize,
}

impl SearchOutcome {
    /// True when at least one queried source reported an error.
    pub fn is_degraded(&self) -> bool {
        self.per_source.iter().any(|s| !s.succeeded())
    }

    /// True when sources were queried and none of them answered.
    pub fn all_failed(&self) -> bool {
        !self.per_source.is_empty() && self.per_source.iter().all(|s| !s.succeeded())
    }
}
