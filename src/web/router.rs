//! Router configuration for Web API.

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    clone_connection, create_connection, delete_connection, get_connection, list_connections,
    preview_connection, save_custom_placeholders, save_external_properties, update_connection,
    AppState,
};
use super::middleware::create_cors_layer;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route(
            "/feeds/:feed_id/connections",
            get(list_connections).post(create_connection),
        )
        .route(
            "/feeds/:feed_id/connections/:id",
            get(get_connection)
                .patch(update_connection)
                .delete(delete_connection),
        )
        .route(
            "/feeds/:feed_id/connections/:id/clone",
            post(clone_connection),
        )
        .route(
            "/feeds/:feed_id/connections/:id/custom-placeholders",
            put(save_custom_placeholders),
        )
        .route(
            "/feeds/:feed_id/connections/:id/external-properties",
            put(save_external_properties),
        )
        .route(
            "/feeds/:feed_id/connections/:id/preview",
            post(preview_connection),
        );

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
