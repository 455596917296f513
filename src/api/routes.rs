//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::api::websocket::ws_handler;
use axum::{
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Fallback handler for unknown routes
async fn fallback_handler(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(handlers::ApiError {
            error: format!("Not Found: {}", uri.path()),
            code: "NOT_FOUND".to_string(),
        }),
    )
}

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket for ledger events
        .route("/ws", get(ws_handler))
        // Reads
        .route("/api/token", get(handlers::get_token_info))
        .route("/api/balance/{account}", get(handlers::get_balance))
        .route("/api/allowance", get(handlers::get_allowance))
        .route("/api/holders", get(handlers::get_holders))
        .route("/api/events", get(handlers::get_events))
        // Transfers and allowances
        .route("/api/transfer", post(handlers::transfer))
        .route("/api/approve", post(handlers::approve))
        .route(
            "/api/increase-allowance",
            post(handlers::increase_allowance),
        )
        .route(
            "/api/decrease-allowance",
            post(handlers::decrease_allowance),
        )
        .route("/api/transfer-from", post(handlers::transfer_from))
        // Privileged
        .route("/api/mint", post(handlers::mint))
        .route("/api/burn", post(handlers::burn))
        .route("/api/pause", post(handlers::pause))
        .route("/api/unpause", post(handlers::unpause))
        .fallback(fallback_handler)
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}
