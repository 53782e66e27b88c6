use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::ApiError;
use crate::{
    domain::search::{Filters, Listing, SearchError, SearchOutcome, SortBy, TextSearch},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_vehicles))
        .route("/search", get(search_text))
        .route("/:id", get(get_vehicle))
}

/// Query-string form of [`Filters`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehicleQuery {
    make: Option<String>,
    model: Option<String>,
    year_min: Option<i32>,
    year_max: Option<i32>,
    price_min: Option<f64>,
    price_max: Option<f64>,
    mileage_min: Option<u32>,
    mileage_max: Option<u32>,
    fuel_type: Option<String>,
    transmission: Option<String>,
    exterior_color: Option<String>,
    interior_color: Option<String>,
    body_type: Option<String>,
    /// Comma separated, e.g. `features=Sunroof,Heated Seats`
    features: Option<String>,
    query: Option<String>,
    /// `price`, `price:desc`, `listingDate:asc`, ...
    sort_by: Option<String>,
    source: Option<String>,
}

impl TryFrom<VehicleQuery> for Filters {
    type Error = SearchError;

    fn try_from(query: VehicleQuery) -> Result<Self, Self::Error> {
        let sort_by = query
            .sort_by
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<SortBy>)
            .transpose()?;

        let features = query
            .features
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect();

        Ok(Filters {
            make: non_blank(query.make),
            model: non_blank(query.model),
            year_min: query.year_min,
            year_max: query.year_max,
            price_min: query.price_min,
            price_max: query.price_max,
            mileage_min: query.mileage_min,
            mileage_max: query.mileage_max,
            fuel_type: non_blank(query.fuel_type),
            transmission: non_blank(query.transmission),
            exterior_color: non_blank(query.exterior_color),
            interior_color: non_blank(query.interior_color),
            body_type: non_blank(query.body_type),
            features,
            query: non_blank(query.query),
            sort_by,
            source: non_blank(query.source),
        })
    }
}

// An empty `?make=` should not turn a cacheable query into a filtered one.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[instrument(name = "GET /vehicles", skip(app_state))]
async fn search_vehicles(
    State(app_state): State<AppState>,
    Query(query): Query<VehicleQuery>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let filters = Filters::try_from(query)?;
    let outcome = app_state.vehicle_search().search(&filters).await?;

    Ok(Json(outcome))
}

#[derive(Debug, Clone, Deserialize)]
struct TextQuery {
    #[serde(default)]
    q: String,
}

#[instrument(name = "GET /vehicles/search", skip(app_state))]
async fn search_text(
    State(app_state): State<AppState>,
    Query(query): Query<TextQuery>,
) -> Result<Json<TextSearch>, ApiError> {
    let result = app_state.vehicle_search().search_text(&query.q).await?;

    Ok(Json(result))
}

#[instrument(name = "GET /vehicles/:id", skip(app_state))]
async fn get_vehicle(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Listing>, ApiError> {
    app_state
        .vehicle_search()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Vehicle {id} not found")))
}
