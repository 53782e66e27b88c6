use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::{app_state::AppState, routes};

pub fn create(app_state: AppState) -> Router<()> {
    let allowed_origin = app_state.app_url.clone();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _| origin.to_str().unwrap_or_default() == allowed_origin,
        ));

    Router::new()
        .route("/", get(|| async { "Hello, little World!" }))
        .nest("/vehicles", routes::vehicles::router())
        .nest("/sources", routes::sources::router())
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
