use serde_json::{json, Value};
use std::sync::Arc;

use super::protocol::{
    negotiate_protocol_version, CallToolParams, CallToolResult, Implementation,
    InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND,
    PARSE_ERROR,
};
use super::tools::{self, ToolError};
use crate::client::SalesforceClient;

/// Name reported in `initialize`
pub const SERVER_NAME: &str = "mcp-salesforce";

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Transport-independent MCP request handler
pub struct McpServer {
    client: Arc<SalesforceClient>,
}

impl McpServer {
    pub fn new(client: Arc<SalesforceClient>) -> Self {
        Self { client }
    }

    /// Handle one raw JSON-RPC message; `None` means nothing is sent back
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to parse JSON-RPC message: {}", e);
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        // Keep the id around so malformed requests can still be answered
        let id = value.get("id").cloned().unwrap_or(Value::Null);

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ));
            }
        };

        self.handle_request(request).await
    }

    /// Dispatch a parsed request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return request.id.map(|id| {
                JsonRpcResponse::failure(id, INVALID_REQUEST, "jsonrpc must be \"2.0\"")
            });
        }

        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "Received notification");
            return None;
        };

        tracing::debug!(method = %request.method, id = %id, "Received request");

        let response = match request.method.as_str() {
            "initialize" => self.initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                let result = ListToolsResult {
                    tools: tools::definitions(),
                };
                to_response(id, &result)
            }
            "tools/call" => self.call_tool(id, request.params).await,
            other => {
                tracing::warn!("Unknown method: {}", other);
                JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {}", other))
            }
        };

        Some(response)
    }

    fn initialize(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        let protocol_version = negotiate_protocol_version(params.protocol_version.as_deref());

        if let Some(ref client_info) = params.client_info {
            tracing::info!(
                client = %client_info.name,
                client_version = %client_info.version,
                protocol_version = protocol_version,
                "MCP client initialized"
            );
        }

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: VERSION.to_string(),
            },
            instructions: Some(
                "Tools for Salesforce Contacts, appointments (Event records) and SOQL queries."
                    .to_string(),
            ),
        };

        to_response(id, &result)
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e))
            }
            None => return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params"),
        };

        tracing::info!(tool = %params.name, "Calling tool");

        let arguments = params.arguments.unwrap_or(Value::Null);
        match tools::call_tool(&self.client, &params.name, arguments).await {
            Ok(value) => to_response(id, &CallToolResult::json(value)),
            Err(err) => tool_failure(id, &params.name, err),
        }
    }
}

/// Map a failed tool call onto a JSON-RPC error or an `isError` result
fn tool_failure(id: Value, tool: &str, err: ToolError) -> JsonRpcResponse {
    match err {
        ToolError::UnknownTool(_) | ToolError::InvalidArguments { .. } => {
            tracing::warn!(tool = %tool, "{}", err);
            JsonRpcResponse::failure(id, INVALID_PARAMS, err.to_string())
        }
        ToolError::Encode { .. } => {
            tracing::error!(tool = %tool, "{}", err);
            JsonRpcResponse::failure(id, INTERNAL_ERROR, format!("Internal error: {}", err))
        }
        ToolError::Salesforce(err) => {
            tracing::error!(
                tool = %tool,
                kind = err.kind(),
                status = ?err.status(),
                "Tool call failed: {}",
                err
            );
            to_response(id, &CallToolResult::error(err.to_string()))
        }
    }
}

fn to_response<T: serde::Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, format!("Internal error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credentials, TokenManager};
    use crate::http_client::{build_client, SalesforceHttpClient};

    fn test_server(base_url: &str) -> McpServer {
        let creds = Credentials {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            refresh_token: "test-refresh-token".to_string(),
            instance_url: base_url.to_string(),
            api_version: "v60.0".to_string(),
        };
        let manager = TokenManager::new(creds, base_url, build_client(10, 30).unwrap())
            .with_access_token("test-access-token");
        let http = SalesforceHttpClient::new(Arc::new(manager));
        McpServer::new(Arc::new(SalesforceClient::new(http)))
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = test_server("http://127.0.0.1:9");
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"test","version":"1.0"}}}"#,
            )
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(response.id, json!(1));
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "mcp-salesforce");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let server = test_server("http://127.0.0.1:9");
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_parse_error() {
        let server = test_server("http://127.0.0.1:9");
        let response = server.handle_message("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
        assert_eq!(response.id, Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_request_keeps_id() {
        let server = test_server("http://127.0.0.1:9");
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":"abc"}"#)
            .await
            .unwrap();
        assert_eq!(response.id, json!("abc"));
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = test_server("http://127.0.0.1:9");
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = test_server("http://127.0.0.1:9");
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#)
            .await
            .unwrap();

        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 11);
        assert!(tools.iter().any(|t| t["name"] == "salesforce_query"));
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let server = test_server("http://127.0.0.1:9");
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"salesforce_drop_table","arguments":{}}}"#,
            )
            .await
            .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert!(error.message.contains("salesforce_drop_table"));
    }

    #[tokio::test]
    async fn test_tool_call_success_and_api_error() {
        let mut sf = mockito::Server::new_async().await;
        let _created = sf
            .mock("POST", "/services/data/v60.0/sobjects/Contact")
            .with_status(201)
            .with_body(r#"{"id":"003new","success":true,"errors":[]}"#)
            .create_async()
            .await;
        let _missing = sf
            .mock("GET", "/services/data/v60.0/sobjects/Contact/003gone")
            .with_status(404)
            .with_body(r#"[{"errorCode":"NOT_FOUND","message":"The requested resource does not exist"}]"#)
            .create_async()
            .await;

        let server = test_server(&sf.url());

        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"salesforce_create_contact","arguments":{"data":{"FirstName":"Ada","LastName":"Lovelace","Phone":"555","Email":"ada@example.com"}}}}"#,
            )
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"]["Id"], "003new");

        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"salesforce_get_contact","arguments":{"contact_id":"003gone"}}}"#,
            )
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("NOT_FOUND"));
    }

    #[test]
    fn test_encode_failure_is_internal_error() {
        let source = serde_json::to_value(std::collections::BTreeMap::from([((1, 2), 3)]))
            .unwrap_err();
        let response = tool_failure(
            json!(7),
            "salesforce_query",
            ToolError::Encode {
                tool: "salesforce_query".to_string(),
                source,
            },
        );

        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, INTERNAL_ERROR);
    }
}
