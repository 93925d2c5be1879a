// Salesforce MCP server - library root

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod mcp;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod soql;

pub use client::SalesforceClient;
pub use error::{Result, SalesforceError};
