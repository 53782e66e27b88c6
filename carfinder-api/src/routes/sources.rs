use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{domain::search::SourceInfo, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_sources))
}

#[instrument(name = "GET /sources", skip(app_state))]
async fn get_sources(State(app_state): State<AppState>) -> Json<Vec<SourceInfo>> {
    Json(app_state.vehicle_search().sources())
}
