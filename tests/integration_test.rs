// Integration tests for the Salesforce MCP server
//
// These tests verify the full HTTP stack including routing, middleware,
// JSON-RPC parsing, and tool dispatch against a mocked Salesforce org.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use mcp_salesforce::{
    auth::{Credentials, TokenManager},
    http_client::{build_client, SalesforceHttpClient},
    mcp::McpServer,
    routes::{self, AppState},
    SalesforceClient,
};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

/// Create a test application state pointed at `base_url` for both OAuth and REST
fn create_test_app_state(base_url: &str, api_key: Option<&str>) -> AppState {
    let credentials = Credentials {
        client_id: "test-client-id".to_string(),
        client_secret: "test-client-secret".to_string(),
        refresh_token: "test-refresh-token".to_string(),
        instance_url: base_url.to_string(),
        api_version: "v60.0".to_string(),
    };

    let client = build_client(10, 30).expect("Failed to create HTTP client");
    let manager =
        TokenManager::new(credentials, base_url, client).with_access_token("test-access-token");

    let http = SalesforceHttpClient::new(Arc::new(manager));

    AppState {
        server: Arc::new(McpServer::new(Arc::new(SalesforceClient::new(http)))),
        proxy_api_key: api_key.map(|k| k.to_string()),
    }
}

/// Build the test application router
fn build_test_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::mcp_routes(state))
}

/// Helper to parse JSON response body
async fn parse_json_body(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn rpc_request(body: Value, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

// ==================================================================================================
// Health Check Tests
// ==================================================================================================

#[tokio::test]
async fn test_root_endpoint() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9", None));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_json_body(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9", None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_json_body(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

// ==================================================================================================
// MCP Endpoint Tests
// ==================================================================================================

#[tokio::test]
async fn test_mcp_requires_key_when_configured() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9", Some("secret-key")));

    let response = app
        .clone()
        .oneshot(rpc_request(
            json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(rpc_request(
            json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
            Some("secret-key"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_body(response.into_body()).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"], json!({}));
}

#[tokio::test]
async fn test_mcp_notification_is_accepted() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9", None));

    let response = app
        .oneshot(rpc_request(
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_mcp_tools_list() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9", None));

    let response = app
        .oneshot(rpc_request(
            json!({"jsonrpc": "2.0", "id": "list", "method": "tools/list"}),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_body(response.into_body()).await;
    let names: Vec<&str> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();

    for expected in [
        "salesforce_create_contact",
        "salesforce_get_contact",
        "salesforce_update_contact",
        "salesforce_delete_contact",
        "salesforce_list_contacts",
        "salesforce_create_appointment",
        "salesforce_get_appointment",
        "salesforce_update_appointment",
        "salesforce_delete_appointment",
        "salesforce_list_appointments",
        "salesforce_query",
    ] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }
}

#[tokio::test]
async fn test_mcp_list_contacts_tool() {
    let mut sf = mockito::Server::new_async().await;
    let query_mock = sf
        .mock("GET", "/services/data/v60.0/query")
        .match_query(mockito::Matcher::UrlEncoded(
            "q".into(),
            "SELECT Id, FirstName, LastName, Phone, Email FROM Contact ORDER BY CreatedDate DESC LIMIT 2"
                .into(),
        ))
        .match_header("authorization", "Bearer test-access-token")
        .with_status(200)
        .with_body(
            json!({
                "totalSize": 2,
                "done": true,
                "records": [
                    {"attributes": {"type": "Contact"}, "Id": "003a", "FirstName": "Ada", "LastName": "Lovelace", "Phone": null, "Email": "ada@example.com"},
                    {"attributes": {"type": "Contact"}, "Id": "003b", "FirstName": "Alan", "LastName": "Turing", "Phone": "555", "Email": null}
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let app = build_test_app(create_test_app_state(&sf.url(), None));

    let response = app
        .oneshot(rpc_request(
            json!({
                "jsonrpc": "2.0",
                "id": 9,
                "method": "tools/call",
                "params": {"name": "salesforce_list_contacts", "arguments": {"limit": 2}}
            }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_body(response.into_body()).await;
    let result = &body["result"];
    assert_eq!(result["isError"], false);
    assert_eq!(result["structuredContent"]["totalSize"], 2);
    assert_eq!(result["structuredContent"]["records"][1]["LastName"], "Turing");
    query_mock.assert_async().await;
}

#[tokio::test]
async fn test_mcp_update_appointment_tool() {
    let mut sf = mockito::Server::new_async().await;
    let patch_mock = sf
        .mock("PATCH", "/services/data/v60.0/sobjects/Event/00Uxyz")
        .match_body(mockito::Matcher::Json(json!({"Subject": "Rescheduled"})))
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let app = build_test_app(create_test_app_state(&sf.url(), None));

    let response = app
        .oneshot(rpc_request(
            json!({
                "jsonrpc": "2.0",
                "id": 10,
                "method": "tools/call",
                "params": {
                    "name": "salesforce_update_appointment",
                    "arguments": {"event_id": "00Uxyz", "data": {"Subject": "Rescheduled"}}
                }
            }),
            None,
        ))
        .await
        .unwrap();

    let body = parse_json_body(response.into_body()).await;
    assert_eq!(
        body["result"]["structuredContent"],
        json!({"status": "success", "event_id": "00Uxyz"})
    );
    patch_mock.assert_async().await;
}

#[tokio::test]
async fn test_mcp_invalid_arguments() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9", None));

    let response = app
        .oneshot(rpc_request(
            json!({
                "jsonrpc": "2.0",
                "id": 11,
                "method": "tools/call",
                "params": {
                    "name": "salesforce_create_appointment",
                    "arguments": {"data": {"Subject": "No times"}}
                }
            }),
            None,
        ))
        .await
        .unwrap();

    let body = parse_json_body(response.into_body()).await;
    assert_eq!(body["error"]["code"], -32602);
}
