use axum::http::{HeaderName, Method};
use gather_shared::constants::APP_NAME;
use gather_server::{config::Config, db, ratelimit, routes, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[tokio::main]
async fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gather_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();

    let pool = db::init_pool(&config.database_path)
        .await
        .expect("Failed to initialize database");

    if config.redis_url.is_none() {
        tracing::info!("REDIS_URL not set, rate limits are enforced per instance");
    }

    let state = Arc::new(AppState::new(pool, config.clone()));

    ratelimit::spawn_local_sweeper(state.limiter.local_counters(), Duration::from_secs(60));

    let app = routes::build_router(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::AllowOrigin::mirror_request())
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    HeaderName::from_static("content-type"),
                    HeaderName::from_static("cookie"),
                    HeaderName::from_static("authorization"),
                ])
                .allow_credentials(true),
        );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");

    tracing::info!("{} server running on {}", APP_NAME, addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
