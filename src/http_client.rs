use anyhow::Context;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{SessionToken, TokenManager};
use crate::error::{Result, SalesforceError};

/// Marker Salesforce puts in the body of a 401 when the session expired
pub const INVALID_SESSION_MARKER: &str = "INVALID_SESSION_ID";

/// Authenticated HTTP client for the Salesforce REST API
///
/// Every request carries the cached bearer token. A 401 whose body names an
/// invalid session triggers exactly one refresh-and-resend.
pub struct SalesforceHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Token manager
    auth: Arc<TokenManager>,
}

/// Build the process-wide HTTP client
///
/// One instance serves both the token endpoint and the REST API so they share
/// the connection pool and timeouts.
pub fn build_client(connect_timeout: u64, request_timeout: u64) -> anyhow::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout))
        .timeout(Duration::from_secs(request_timeout))
        .build()
        .context("Failed to create HTTP client")
}

impl SalesforceHttpClient {
    /// Create a pipeline on top of the token manager's HTTP client
    pub fn new(auth: Arc<TokenManager>) -> Self {
        let client = auth.client().clone();
        Self { client, auth }
    }

    /// Execute a request relative to the versioned API base
    ///
    /// Returns the successful response (2xx, including 204). Any other status
    /// left after the retry policy becomes `SalesforceError::Api`.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&Value>,
    ) -> Result<Response> {
        let token = self.auth.access_token().await?;

        let response = self.send(&method, path, query, body, &token).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED && error_text.contains(INVALID_SESSION_MARKER) {
            tracing::warn!(
                method = %method,
                path = %path,
                "Salesforce session invalid, refreshing token and retrying once"
            );

            let token = self.auth.refresh_rejected(&token).await?;
            let response = self.send(&method, path, query, body, &token).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            let error_text = response.text().await.unwrap_or_default();
            return Err(self.api_error(&method, path, status, error_text, 2));
        }

        Err(self.api_error(&method, path, status, error_text, 1))
    }

    /// Build and send one attempt with the given token
    async fn send(
        &self,
        method: &Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&Value>,
        token: &SessionToken,
    ) -> Result<Response> {
        let url = build_url(&self.auth.api_base_for(&token.instance_url), path);

        tracing::debug!(
            method = %method,
            url = %url,
            "Sending Salesforce request"
        );

        let mut request: RequestBuilder = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&token.access_token)
            .header("Accept", "application/json");

        if let Some(query) = query {
            request = request.query(query);
        }

        if let Some(body) = body {
            if is_mutating(method) {
                request = request.header("Content-Type", "application/json");
            }
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            let error_kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connection_failed"
            } else if e.is_request() {
                "request_error"
            } else {
                "unknown"
            };
            tracing::error!(
                error_kind = error_kind,
                error = %e,
                url = %url,
                "Salesforce request error"
            );
            SalesforceError::Http(e)
        })?;

        tracing::debug!(status = %response.status(), "Received Salesforce response");
        Ok(response)
    }

    fn api_error(
        &self,
        method: &Method,
        path: &str,
        status: StatusCode,
        body: String,
        attempts: u32,
    ) -> SalesforceError {
        tracing::error!(
            status = status.as_u16(),
            method = %method,
            path = %path,
            response_body = %body,
            attempts = attempts,
            "Salesforce request failed with error response"
        );
        SalesforceError::Api {
            status: status.as_u16(),
            body,
        }
    }

    /// Get the token manager
    pub fn auth(&self) -> &Arc<TokenManager> {
        &self.auth
    }
}

/// Methods whose bodies are sent as JSON documents
fn is_mutating(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PATCH || *method == Method::PUT
}

/// Join the API base and a relative path with exactly one separator
pub fn build_url(api_base: &str, path: &str) -> String {
    let base = api_base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}
