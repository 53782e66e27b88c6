use carfinder_api::{config::read_config, factory::build_vehicle_search, router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carfinder_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let config = read_config().expect("Failed to read configuration");

    let vehicle_search = build_vehicle_search(&config)
        .await
        .expect("Failed to build vehicle search");
    let app_state = AppState::new(config.application.app_url.clone(), vehicle_search);
    let app = router::create(app_state);

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind address");
    tracing::info!("Listening on {}", address);

    axum::serve(listener, app).await.expect("Server error");
}
