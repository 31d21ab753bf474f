use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::{
    assets,
    config::{AllowedOrigins, AppConfig},
    state::AppState,
};

pub mod handlers;
pub mod submit;
pub mod types;

pub fn router(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route(
            "/submit",
            post(submit::submit).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
}

/// Full application: API routes, frontend bundle, CORS, shared state.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .merge(router(&config))
        .merge(assets::router(&config.frontend_dist))
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::any(),
        AllowedOrigins::List(list) => AllowOrigin::list(list.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| warn!(%origin, "ignoring unparseable CORS origin"))
                .ok()
        })),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers(Any)
        .allow_methods(Any)
}
