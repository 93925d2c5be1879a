// Error handling module
// Defines the error taxonomy surfaced by the Salesforce client

use thiserror::Error;

/// Errors that can occur while talking to Salesforce
#[derive(Error, Debug)]
pub enum SalesforceError {
    /// OAuth token endpoint rejected the refresh
    #[error("Salesforce authentication failed: {status} - {body}")]
    Authentication { status: u16, body: String },

    /// REST resource endpoint returned a non-success status
    #[error("Salesforce API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// Success status but the payload did not have the expected shape
    #[error("Malformed Salesforce response: {0}")]
    MalformedResponse(String),

    /// Caller supplied input that cannot be sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl SalesforceError {
    /// HTTP status carried by the error, if the remote answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            SalesforceError::Authentication { status, .. } | SalesforceError::Api { status, .. } => {
                Some(*status)
            }
            SalesforceError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Short machine-readable category, used in logs and tool error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            SalesforceError::Authentication { .. } => "authentication_error",
            SalesforceError::Api { .. } => "api_error",
            SalesforceError::MalformedResponse(_) => "malformed_response",
            SalesforceError::Validation(_) => "validation_error",
            SalesforceError::Http(_) => "http_error",
        }
    }
}

/// Result type alias for Salesforce operations
pub type Result<T> = std::result::Result<T, SalesforceError>;
