//! Generic marketplace HTTP API source.
//!
//! Speaks a simple JSON listings endpoint: `GET {base_url}/listings?make=..`
//! returning `{ "listings": [...] }` in the marketplace's own record shape.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::validated;
use crate::domain::search::traits::{ListingSource, Result, SearchError};
use crate::domain::search::types::{Filters, Listing};

#[derive(Debug, Deserialize)]
struct ListingsResponse {
    #[serde(default)]
    listings: Vec<MarketplaceRecord>,
}

/// A listing as the marketplace API returns it.
#[derive(Debug, Clone, Default, Deserialize)]
struct MarketplaceRecord {
    listing_id: String,
    vin: Option<String>,
    make: Option<String>,
    model: Option<String>,
    year: Option<i32>,
    price: Option<f64>,
    odometer: Option<u32>,
    exterior_color: Option<String>,
    interior_color: Option<String>,
    fuel: Option<String>,
    transmission: Option<String>,
    engine: Option<String>,
    body_style: Option<String>,
    description: Option<String>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    photos: Vec<String>,
    city: Option<String>,
    state: Option<String>,
    seller: Option<String>,
    posted_at: Option<NaiveDate>,
    url: Option<String>,
}

impl MarketplaceRecord {
    fn into_listing(self, source_name: &str) -> Result<Listing> {
        let missing = |field: &str| SearchError::InvalidListing {
            id: self.listing_id.clone(),
            reason: format!("missing {field}"),
        };

        let make = self.make.clone().ok_or_else(|| missing("make"))?;
        let model = self.model.clone().ok_or_else(|| missing("model"))?;
        let year = self.year.ok_or_else(|| missing("year"))?;
        let price = self.price.ok_or_else(|| missing("price"))?;

        let location = match (self.city, self.state) {
            (Some(city), Some(state)) => format!("{city}, {state}"),
            (Some(city), None) => city,
            (None, Some(state)) => state,
            (None, None) => String::new(),
        };

        Ok(Listing {
            id: self.listing_id,
            vin: self.vin.filter(|v| !v.trim().is_empty()),
            make,
            model,
            year,
            price,
            mileage: self.odometer.unwrap_or_default(),
            exterior_color: self.exterior_color.unwrap_or_default(),
            interior_color: self.interior_color.unwrap_or_default(),
            fuel_type: self.fuel.unwrap_or_default(),
            transmission: self.transmission.unwrap_or_default(),
            engine: self.engine.unwrap_or_default(),
            body_type: self.body_style,
            description: self.description.unwrap_or_default(),
            features: self.options,
            images: self.photos,
            location,
            dealer: self.seller.unwrap_or_default(),
            listing_date: self.posted_at.unwrap_or_else(|| Utc::now().date_naive()),
            source_name: source_name.to_string(),
            url: self.url.unwrap_or_default(),
        })
    }
}

/// Source backed by a marketplace JSON API.
///
/// # Example
///
/// ```ignore
/// let source = MarketplaceSource::new("marketplace", "https://api.example.com", None, timeout)?;
/// ```
#[derive(Debug, Clone)]
pub struct MarketplaceSource {
    name: String,
    base_url: Url,
    api_key: Option<String>,
    client: Client,
}

impl MarketplaceSource {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SearchError::Config(format!("invalid marketplace url '{base_url}': {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            name: name.into(),
            base_url,
            api_key,
            client,
        })
    }

    /// Build the request URL, pushing down the filters the API understands.
    fn listings_url(&self, filters: &Filters) -> Result<Url> {
        let mut url = self
            .base_url
            .join("listings")
            .map_err(|e| SearchError::Config(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            if let Some(make) = &filters.make {
                query.append_pair("make", make);
            }
            if let Some(model) = &filters.model {
                query.append_pair("model", model);
            }
            if let Some(year_min) = filters.year_min {
                query.append_pair("year_from", &year_min.to_string());
            }
            if let Some(year_max) = filters.year_max {
                query.append_pair("year_to", &year_max.to_string());
            }
            if let Some(price_min) = filters.price_min {
                query.append_pair("price_from", &price_min.to_string());
            }
            if let Some(price_max) = filters.price_max {
                query.append_pair("price_to", &price_max.to_string());
            }
            if let Some(mileage_max) = filters.mileage_max {
                query.append_pair("odometer_to", &mileage_max.to_string());
            }
            if let Some(body_type) = &filters.body_type {
                query.append_pair("body_style", body_type);
            }
        }

        Ok(url)
    }
}

fn into_listings(response: ListingsResponse, source_name: &str) -> Vec<Listing> {
    let listings = response
        .listings
        .into_iter()
        .filter_map(|record| match record.into_listing(source_name) {
            Ok(listing) => Some(listing),
            Err(e) => {
                tracing::warn!(source = source_name, error = %e, "Rejected marketplace record");
                None
            }
        })
        .collect();

    validated(source_name, listings)
}

#[async_trait]
impl ListingSource for MarketplaceSource {
    async fn search(&self, filters: &Filters) -> Result<Vec<Listing>> {
        let url = self.listings_url(filters)?;
        debug!(source = %self.name, %url, "Querying marketplace");

        let mut request = self.client.get(url);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?.error_for_status()?;
        let body: ListingsResponse = response.json().await?;

        Ok(into_listings(body, &self.name))
    }
}
