use crate::{handlers, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/captions", get(handlers::list_captions))
        .route("/captions/generate", post(handlers::generate_caption))
        .route("/captions/{id}/like", post(handlers::like_caption))
        .route(
            "/votes",
            get(handlers::lookup_votes).post(handlers::submit_vote),
        )
        .route("/analytics", get(handlers::get_analytics))
        .route("/flavors", get(handlers::list_flavors))
        .route("/images", post(handlers::register_image))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        // Bodies are small JSON; image bytes go straight to the object
        // store via presigned URLs and never pass through this service.
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}
