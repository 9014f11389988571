//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// See [`handlers`] for the REST table; `GET /ws/events` streams the
/// event mirror.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/events", get(ws::ws_events))
        // REST API
        .route("/api/status", get(handlers::get_status))
        .route("/api/territories", get(handlers::list_territories))
        .route("/api/territories/spatial", get(handlers::territories_in_radius))
        .route("/api/territories/{id}", get(handlers::get_territory))
        .route("/api/territories/{id}/dominant", get(handlers::get_control))
        .route(
            "/api/territories/{id}/influence/{faction}",
            get(handlers::get_influence),
        )
        .route("/api/routes", get(handlers::list_routes))
        .route("/api/routes/{id}", get(handlers::get_route))
        .route("/api/updates", get(handlers::list_updates))
        .route("/api/sieges", get(handlers::list_sieges))
        .route("/api/decisions", get(handlers::list_decisions))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
