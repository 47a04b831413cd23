//! HTTP route definitions

use crate::{AppState, handlers, middleware};
use axum::{Router, middleware as axum_middleware, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the main router
///
/// Health endpoints and `/favicon.ico` are matched first; every other path
/// is an object path and goes to the serving pipeline.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Service endpoints
        .route("/_health", get(handlers::health_check))
        .route("/health-check", get(handlers::health_check))
        .route("/favicon.ico", get(handlers::not_found))
        // Object paths, any method
        .fallback(handlers::serve_object)
        // Apply middleware
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::access_log_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
