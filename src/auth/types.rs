// Authentication types

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Immutable credential set supplied at startup
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub instance_url: String,
    pub api_version: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Bearer token minted by the OAuth endpoint
///
/// Replaced wholesale on every refresh; never mutated in place.
#[derive(Clone, PartialEq)]
pub struct SessionToken {
    pub access_token: String,
    pub token_type: String,
    /// Org base URL this token is valid against
    pub instance_url: String,
    pub issued_at: DateTime<Utc>,
    pub signature: Option<String>,
}

impl SessionToken {
    /// First characters of the token, safe to log
    pub fn masked(&self) -> String {
        let prefix = self.access_token.get(..8).unwrap_or("");
        format!("{}...", prefix)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &self.masked())
            .field("token_type", &self.token_type)
            .field("instance_url", &self.instance_url)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// OAuth token endpoint response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub instance_url: Option<String>,
    pub token_type: Option<String>,
    /// Epoch milliseconds; Salesforce sends it as a string
    pub issued_at: Option<Value>,
    pub signature: Option<String>,
}

impl TokenResponse {
    /// Convert into a session token, keeping `fallback_instance_url` when the
    /// response does not carry a new one
    pub fn into_session(self, fallback_instance_url: &str) -> SessionToken {
        let instance_url = self
            .instance_url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .unwrap_or(fallback_instance_url)
            .to_string();

        let issued_at = self
            .issued_at
            .as_ref()
            .and_then(parse_issued_at)
            .unwrap_or_else(Utc::now);

        SessionToken {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            instance_url,
            issued_at,
            signature: self.signature,
        }
    }
}

/// Parse `issued_at` from either a string or a number of epoch milliseconds
fn parse_issued_at(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::String(s) => s.parse::<i64>().ok()?,
        Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}
