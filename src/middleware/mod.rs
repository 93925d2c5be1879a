// Authentication and CORS middleware

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::AppState;

/// Authentication middleware
///
/// Passes everything through when no API key is configured. Otherwise expects
/// "Bearer {PROXY_API_KEY}" in Authorization or the bare key in x-api-key.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(ref expected_key) = state.proxy_api_key else {
        return next.run(request).await;
    };

    if let Some(auth_header) = request.headers().get("authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if auth_str.strip_prefix("Bearer ") == Some(expected_key.as_str()) {
                return next.run(request).await;
            }
        }
    }

    if let Some(api_key_header) = request.headers().get("x-api-key") {
        if let Ok(key_str) = api_key_header.to_str() {
            if key_str == expected_key.as_str() {
                return next.run(request).await;
            }
        }
    }

    let path = request.uri().path();
    let method = request.method();
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
    tracing::warn!(
        "[{}] Access attempt with invalid or missing API key: {} {}",
        request_id,
        method,
        path
    );

    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "message": "Invalid or missing API Key",
                "type": "auth_error",
            }
        })),
    )
        .into_response()
}

/// Create CORS middleware layer
///
/// Configures CORS to allow all origins, methods, and headers.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credentials, TokenManager};
    use crate::client::SalesforceClient;
    use crate::http_client::{build_client, SalesforceHttpClient};
    use crate::mcp::McpServer;
    use axum::{routing::get, Router};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_state(key: Option<&str>) -> AppState {
        let creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            instance_url: "http://127.0.0.1:9".to_string(),
            api_version: "v60.0".to_string(),
        };
        let manager = TokenManager::new(creds, "http://127.0.0.1:9", build_client(5, 5).unwrap());
        let http = SalesforceHttpClient::new(Arc::new(manager));

        AppState {
            server: Arc::new(McpServer::new(Arc::new(SalesforceClient::new(http)))),
            proxy_api_key: key.map(|k| k.to_string()),
        }
    }

    async fn test_handler() -> &'static str {
        "OK"
    }

    fn create_test_app(state: AppState) -> Router {
        Router::new()
            .route("/test", get(test_handler))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            ))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_no_key_configured_passes_through() {
        let app = create_test_app(create_test_state(None));
        let response = app
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bearer_key_accepted() {
        let app = create_test_app(create_test_state(Some("test-key-123")));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header("Authorization", "Bearer test-key-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_x_api_key_accepted() {
        let app = create_test_app(create_test_state(Some("test-key-123")));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header("x-api-key", "test-key-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_or_wrong_key_rejected() {
        let app = create_test_app(create_test_state(Some("test-key-123")));
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header("Authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
