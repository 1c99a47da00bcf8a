use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use chess_academy_core::Config;

mod routes;

pub struct AppState {
    pub config: Config,
}

pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.config.max_upload_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/pgn/parse", post(routes::parse_pgn))
        .route("/api/pgn/replay", post(routes::replay_game))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let state = Arc::new(AppState {
        config: Config::from_env(),
    });

    let addr = std::env::var("ACADEMY_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server running at http://{}", addr);

    axum::serve(listener, app(state)).await
}
