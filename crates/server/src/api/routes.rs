use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{acquisition, handlers, lookup, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Lookup (no download)
        .route("/lookup", get(lookup::lookup))
        // Acquisitions
        .route("/acquisitions", post(acquisition::acquire))
        .route(
            "/acquisitions/in-flight",
            get(acquisition::list_in_flight).delete(acquisition::cancel),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
