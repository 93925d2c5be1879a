// Token refresh logic

use reqwest::Client;

use super::types::{Credentials, TokenResponse};
use crate::error::{Result, SalesforceError};

/// Get the OAuth token endpoint for a login host
pub fn token_url(login_url: &str) -> String {
    format!("{}/services/oauth2/token", login_url.trim_end_matches('/'))
}

/// Exchange the refresh token for a new access token
pub async fn request_access_token(
    client: &Client,
    token_url: &str,
    creds: &Credentials,
) -> Result<TokenResponse> {
    tracing::info!("Refreshing Salesforce access token...");
    tracing::debug!(
        "OAuth refresh request: url={}, client_id={}...",
        token_url,
        creds.client_id.get(..8).unwrap_or(&creds.client_id)
    );

    // Salesforce expects form-urlencoded data
    let form = [
        ("grant_type", "refresh_token"),
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
        ("refresh_token", creds.refresh_token.as_str()),
    ];

    let response = client
        .post(token_url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(
            "Salesforce token refresh failed: status={}, body={}",
            status,
            error_text
        );

        // Try to parse OAuth error for more details
        if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&error_text) {
            if let (Some(error_code), Some(error_desc)) = (
                error_json.get("error").and_then(|v| v.as_str()),
                error_json.get("error_description").and_then(|v| v.as_str()),
            ) {
                tracing::error!(
                    "OAuth error details: error={}, description={}",
                    error_code,
                    error_desc
                );
            }
        }

        return Err(SalesforceError::Authentication {
            status: status.as_u16(),
            body: error_text,
        });
    }

    let body = response.text().await?;
    let data: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        SalesforceError::MalformedResponse(format!("token response: {}", e))
    })?;

    if data.access_token.is_empty() {
        return Err(SalesforceError::MalformedResponse(
            "token response does not contain access_token".to_string(),
        ));
    }

    Ok(data)
}
