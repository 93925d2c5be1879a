// Salesforce domain operations
// Each operation is one request through the authenticated pipeline

use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::TokenManager;
use crate::config::Config;
use crate::error::{Result, SalesforceError};
use crate::http_client::{self, SalesforceHttpClient};
use crate::models::{
    Appointment, AppointmentUpdate, Contact, ContactUpdate, CreateResult, NewAppointment,
    NewContact, QueryResult,
};
use crate::soql;

const CONTACT: &str = "Contact";
const EVENT: &str = "Event";

/// Typed Salesforce client for Contacts, Events and SOQL queries
pub struct SalesforceClient {
    http: SalesforceHttpClient,
}

impl SalesforceClient {
    pub fn new(http: SalesforceHttpClient) -> Self {
        Self { http }
    }

    /// Build the token manager and HTTP pipeline from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = http_client::build_client(
            config.http_connect_timeout,
            config.http_request_timeout,
        )?;

        let mut manager = TokenManager::new(config.credentials(), &config.login_url, client);
        if let Some(ref token) = config.access_token {
            tracing::info!("Using pre-minted access token from configuration");
            manager = manager.with_access_token(token.clone());
        }

        Ok(Self::new(SalesforceHttpClient::new(Arc::new(manager))))
    }

    /// Get the token manager
    pub fn auth(&self) -> &Arc<TokenManager> {
        self.http.auth()
    }

    // ==============================================================================================
    // Contacts
    // ==============================================================================================

    /// Create a Contact and return its Id
    pub async fn create_contact(&self, contact: &NewContact) -> Result<String> {
        self.create_record(CONTACT, contact).await
    }

    pub async fn get_contact(&self, contact_id: &str) -> Result<Contact> {
        self.get_record(CONTACT, contact_id).await
    }

    pub async fn update_contact(&self, contact_id: &str, update: &ContactUpdate) -> Result<()> {
        self.update_record(CONTACT, contact_id, update).await
    }

    pub async fn delete_contact(&self, contact_id: &str) -> Result<()> {
        self.delete_record(CONTACT, contact_id).await
    }

    /// Most recently created Contacts
    pub async fn list_contacts(&self, limit: u32) -> Result<QueryResult<Contact>> {
        self.query_as(&soql::list_contacts(limit)).await
    }

    // ==============================================================================================
    // Appointments (Events)
    // ==============================================================================================

    /// Create an Event and return its Id
    pub async fn create_appointment(&self, appointment: &NewAppointment) -> Result<String> {
        self.create_record(EVENT, appointment).await
    }

    pub async fn get_appointment(&self, event_id: &str) -> Result<Appointment> {
        self.get_record(EVENT, event_id).await
    }

    pub async fn update_appointment(
        &self,
        event_id: &str,
        update: &AppointmentUpdate,
    ) -> Result<()> {
        self.update_record(EVENT, event_id, update).await
    }

    pub async fn delete_appointment(&self, event_id: &str) -> Result<()> {
        self.delete_record(EVENT, event_id).await
    }

    /// Latest-starting Events
    pub async fn list_appointments(&self, limit: u32) -> Result<QueryResult<Appointment>> {
        self.query_as(&soql::list_appointments(limit)).await
    }

    // ==============================================================================================
    // Queries
    // ==============================================================================================

    /// Run caller-supplied SOQL as-is
    pub async fn query(&self, soql: &str) -> Result<QueryResult<Value>> {
        self.query_as(soql).await
    }

    async fn query_as<T: DeserializeOwned>(&self, soql: &str) -> Result<QueryResult<T>> {
        tracing::debug!(soql = %soql, "Running SOQL query");
        let response = self
            .http
            .execute(Method::GET, "/query", Some(&[("q", soql)][..]), None)
            .await?;
        decode(response, "query").await
    }

    // ==============================================================================================
    // sObject helpers
    // ==============================================================================================

    async fn create_record<B: Serialize>(&self, sobject: &str, body: &B) -> Result<String> {
        let body = encode(sobject, body)?;
        let response = self
            .http
            .execute(Method::POST, &format!("/sobjects/{}", sobject), None, Some(&body))
            .await?;

        let created: CreateResult = decode(response, "create").await?;
        tracing::info!(sobject = sobject, id = %created.id, "Created Salesforce record");
        Ok(created.id)
    }

    async fn get_record<T: DeserializeOwned>(&self, sobject: &str, id: &str) -> Result<T> {
        let path = record_path(sobject, id)?;
        let response = self.http.execute(Method::GET, &path, None, None).await?;
        decode(response, sobject).await
    }

    async fn update_record<B: Serialize>(&self, sobject: &str, id: &str, body: &B) -> Result<()> {
        let path = record_path(sobject, id)?;
        let body = encode(sobject, body)?;
        self.http
            .execute(Method::PATCH, &path, None, Some(&body))
            .await?;
        tracing::info!(sobject = sobject, id = %id, "Updated Salesforce record");
        Ok(())
    }

    async fn delete_record(&self, sobject: &str, id: &str) -> Result<()> {
        let path = record_path(sobject, id)?;
        self.http.execute(Method::DELETE, &path, None, None).await?;
        tracing::info!(sobject = sobject, id = %id, "Deleted Salesforce record");
        Ok(())
    }
}

/// `/sobjects/{Type}/{id}` with the id checked before interpolation
fn record_path(sobject: &str, id: &str) -> Result<String> {
    let id = validate_record_id(id)?;
    Ok(format!("/sobjects/{}/{}", sobject, id))
}

/// Salesforce ids are 15 or 18 alphanumeric characters; anything that could
/// escape the path segment is rejected
fn validate_record_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(SalesforceError::Validation("record id is empty".to_string()));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SalesforceError::Validation(format!(
            "record id must be alphanumeric: {}",
            id
        )));
    }
    Ok(id)
}

fn encode<B: Serialize>(sobject: &str, body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| {
        SalesforceError::Validation(format!("cannot encode {} body: {}", sobject, e))
    })
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| SalesforceError::MalformedResponse(format!("{} response: {}", what, e)))
}
