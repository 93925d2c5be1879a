use chrono::Utc;
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};

use super::refresh;
use super::types::{Credentials, SessionToken};
use crate::error::Result;

/// Token manager
/// Holds the single cached session token and serializes refreshes
pub struct TokenManager {
    /// Immutable credentials from startup
    credentials: Credentials,

    /// OAuth token endpoint
    token_url: String,

    /// Process-wide HTTP client, shared with the request pipeline
    client: Client,

    /// Current session token (absent until first refresh)
    session: RwLock<Option<SessionToken>>,

    /// Held for the duration of a refresh so concurrent callers never race
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    /// Create a new TokenManager; no token is minted until first use
    pub fn new(credentials: Credentials, login_url: &str, client: Client) -> Self {
        Self {
            token_url: refresh::token_url(login_url),
            credentials,
            client,
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Seed the cache with an already-minted access token
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        let token = SessionToken {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            instance_url: self.credentials.instance_url.clone(),
            issued_at: Utc::now(),
            signature: None,
        };
        *self.session.get_mut() = Some(token);
        self
    }

    /// Mint a new token unconditionally
    pub async fn refresh(&self) -> Result<SessionToken> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Perform the exchange and replace the cached token. Caller holds `refresh_lock`.
    async fn refresh_locked(&self) -> Result<SessionToken> {
        let fallback_instance_url = self.instance_url().await;

        let data =
            refresh::request_access_token(&self.client, &self.token_url, &self.credentials).await?;
        let token = data.into_session(&fallback_instance_url);

        if token.instance_url != fallback_instance_url {
            tracing::info!(
                "Salesforce instance URL changed: {} -> {}",
                fallback_instance_url,
                token.instance_url
            );
        }

        tracing::info!(
            token = %token.masked(),
            instance_url = %token.instance_url,
            issued_at = %token.issued_at.to_rfc3339(),
            "Salesforce access token refreshed"
        );

        *self.session.write().await = Some(token.clone());
        Ok(token)
    }

    /// Get the cached token, refreshing first if none is cached
    pub async fn access_token(&self) -> Result<SessionToken> {
        if let Some(token) = self.session.read().await.as_ref() {
            return Ok(token.clone());
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have minted a token while we waited
        if let Some(token) = self.session.read().await.as_ref() {
            return Ok(token.clone());
        }

        tracing::debug!("No cached access token, refreshing");
        self.refresh_locked().await
    }

    /// Refresh after the remote rejected `rejected`
    ///
    /// If the cached token has already been replaced since `rejected` was
    /// handed out, the newer token is returned without another exchange.
    pub async fn refresh_rejected(&self, rejected: &SessionToken) -> Result<SessionToken> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.session.read().await.as_ref() {
            if current.access_token != rejected.access_token {
                tracing::debug!("Rejected token already replaced, reusing current token");
                return Ok(current.clone());
            }
        }

        self.refresh_locked().await
    }

    /// Get the cached token without refreshing
    pub async fn current_token(&self) -> Option<SessionToken> {
        self.session.read().await.clone()
    }

    /// Current org base URL
    pub async fn instance_url(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(token) => token.instance_url.clone(),
            None => self.credentials.instance_url.clone(),
        }
    }

    /// Version-scoped REST base for the current org
    pub async fn api_base_url(&self) -> String {
        let instance_url = self.instance_url().await;
        self.api_base_for(&instance_url)
    }

    /// Version-scoped REST base for a given org base URL
    pub fn api_base_for(&self, instance_url: &str) -> String {
        format!(
            "{}/services/data/{}",
            instance_url.trim_end_matches('/'),
            self.credentials.api_version
        )
    }

    /// HTTP client used for token exchanges
    pub fn client(&self) -> &Client {
        &self.client
    }
}
