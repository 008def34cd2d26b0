//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`. The activity feed
//! lives at `/ws`.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Builds the REST router plus the WebSocket feed, bound to `state`.
///
/// Middleware (tracing, CORS, timeouts) is left to the caller.
pub fn build_app(state: AppState) -> Router {
    let router = build_router().route("/ws", get(ws_handler));
    #[cfg(feature = "swagger-ui")]
    let router = router.merge(openapi::swagger_ui());
    router.with_state(state)
}
