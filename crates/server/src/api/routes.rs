use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{enhancements, handlers};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Enhancements
        .route("/enhancements", post(enhancements::accept_enhancement))
        .route("/enhancements", get(enhancements::list_enhancements))
        .route(
            "/enhancements/{tenant_id}/{ticket_id}",
            get(enhancements::get_enhancement),
        )
        // Dispatcher
        .route("/dispatcher/status", get(handlers::dispatcher_status))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
}
