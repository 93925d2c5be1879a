use axum::{
    extract::State,
    http::StatusCode,
    middleware::{self as axum_middleware},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::mcp::McpServer;
use crate::middleware;

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
    /// When set, `/mcp` requires this key
    pub proxy_api_key: Option<String>,
}

/// Health check routes (no authentication required)
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

/// MCP JSON-RPC endpoint (authenticated when an API key is configured)
pub fn mcp_routes(state: AppState) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}

/// GET / - Simple health check
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Salesforce MCP server is running",
        "version": VERSION
    }))
}

/// GET /health - Detailed health check
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION
    }))
}

/// POST /mcp - Handle one JSON-RPC message
///
/// Requests are answered with the JSON-RPC response; notifications get
/// `202 Accepted` with an empty body.
async fn mcp_handler(State(state): State<AppState>, body: String) -> Response {
    match state.server.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
