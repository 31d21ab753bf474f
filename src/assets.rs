use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};
use tracing::warn;

use crate::state::AppState;

/// Prebuilt single-page frontend: `/` is the index document, `/assets` the bundle.
pub fn router(dist: &Path) -> Router<AppState> {
    let router = Router::new().route_service("/", ServeFile::new(dist.join("index.html")));

    let assets = dist.join("assets");
    if assets.is_dir() {
        router.nest_service("/assets", ServeDir::new(assets))
    } else {
        warn!(path = %assets.display(), "frontend assets not found; /assets not mounted");
        router
    }
}
