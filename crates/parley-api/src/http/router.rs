//! Axum router for webhook mode.
//!
//! Routes: `POST /{webhook path}` receives Telegram updates, `GET /health`
//! answers liveness probes. Middleware: tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let webhook_path = format!("/{}", state.config.webhook.path.trim_matches('/'));

    Router::new()
        .route(&webhook_path, post(handlers::webhook::receive_update))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
