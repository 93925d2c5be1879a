use anyhow::{Context, Result};
use clap::Parser;

use crate::auth::Credentials;

/// Default Salesforce REST API version
pub const DEFAULT_API_VERSION: &str = "v60.0";

/// Default OAuth host for production orgs
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// Salesforce MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Connected app consumer key
    #[arg(long, env = "SALESFORCE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Connected app consumer secret
    #[arg(long, env = "SALESFORCE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// OAuth refresh token used to mint access tokens
    #[arg(long, env = "SALESFORCE_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Org base URL (e.g. https://xxx.my.salesforce.com)
    #[arg(short = 'i', long, env = "SALESFORCE_INSTANCE_URL")]
    pub instance_url: Option<String>,

    /// REST API version
    #[arg(long, env = "SALESFORCE_API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// OAuth host (use https://test.salesforce.com for sandboxes)
    #[arg(long, env = "SALESFORCE_LOGIN_URL", default_value = DEFAULT_LOGIN_URL)]
    pub login_url: String,

    /// Pre-minted access token; skips the first refresh
    #[arg(long, env = "SALESFORCE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Tool transport (stdio, http)
    #[arg(short, long, env = "MCP_TRANSPORT", default_value = "stdio")]
    pub transport: String,

    /// Server host address (http transport)
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port (http transport)
    #[arg(short, long, env = "SERVER_PORT", default_value = "8000")]
    pub port: u16,

    /// API key required on /mcp (http transport)
    #[arg(short = 'k', long, env = "PROXY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10")]
    pub connect_timeout: u64,
}

#[derive(Clone)]
pub struct Config {
    // Salesforce credentials
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub instance_url: String,
    pub api_version: String,
    pub login_url: String,
    pub access_token: Option<String>,

    // HTTP client
    pub http_request_timeout: u64,
    pub http_connect_timeout: u64,

    // Tool transport
    pub transport: Transport,
    pub server_host: String,
    pub server_port: u16,
    pub proxy_api_key: Option<String>,

    pub log_level: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Transport {
    Stdio,
    Http,
}

/// Secrets are printed as presence markers only
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "[REDACTED]"
            } else {
                "None"
            }
        }

        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .field("login_url", &self.login_url)
            .field("access_token", &redact(&self.access_token))
            .field("http_request_timeout", &self.http_request_timeout)
            .field("http_connect_timeout", &self.http_connect_timeout)
            .field("transport", &self.transport)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("proxy_api_key", &redact(&self.proxy_api_key))
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(CliArgs::parse())
    }

    /// Build configuration from parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Config {
            client_id: args
                .client_id
                .context("SALESFORCE_CLIENT_ID is required (use --client-id or set the env var)")?,
            client_secret: args.client_secret.context(
                "SALESFORCE_CLIENT_SECRET is required (use --client-secret or set the env var)",
            )?,
            refresh_token: args.refresh_token.context(
                "SALESFORCE_REFRESH_TOKEN is required (use --refresh-token or set the env var)",
            )?,
            instance_url: normalize_base_url(&args.instance_url.context(
                "SALESFORCE_INSTANCE_URL is required (use -i or set the env var)",
            )?),
            api_version: normalize_api_version(&args.api_version),
            login_url: normalize_base_url(&args.login_url),
            access_token: args.access_token.filter(|t| !t.trim().is_empty()),

            http_request_timeout: args.http_timeout,
            http_connect_timeout: args.connect_timeout,

            transport: parse_transport(&args.transport)?,
            server_host: args.host,
            server_port: args.port,
            proxy_api_key: args.api_key.filter(|k| !k.is_empty()),

            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("SALESFORCE_CLIENT_ID", &self.client_id),
            ("SALESFORCE_CLIENT_SECRET", &self.client_secret),
            ("SALESFORCE_REFRESH_TOKEN", &self.refresh_token),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
        }

        for (name, value) in [
            ("SALESFORCE_INSTANCE_URL", &self.instance_url),
            ("SALESFORCE_LOGIN_URL", &self.login_url),
        ] {
            if !value.starts_with("https://") && !value.starts_with("http://") {
                anyhow::bail!("{} must be an http(s) URL: {}", name, value);
            }
        }

        if self.api_version.len() < 2 {
            anyhow::bail!("SALESFORCE_API_VERSION is invalid: {}", self.api_version);
        }

        if self.http_request_timeout == 0 || self.http_connect_timeout == 0 {
            anyhow::bail!("HTTP timeouts must be greater than zero");
        }

        Ok(())
    }

    /// Immutable credential set handed to the token manager
    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: self.refresh_token.clone(),
            instance_url: self.instance_url.clone(),
            api_version: self.api_version.clone(),
        }
    }
}

/// Trim whitespace and trailing slashes from a base URL
fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Accept both "60.0" and "v60.0"
fn normalize_api_version(version: &str) -> String {
    let version = version.trim().trim_matches('/');
    if version.starts_with('v') || version.starts_with('V') {
        format!("v{}", &version[1..])
    } else {
        format!("v{}", version)
    }
}

/// Parse transport from string
fn parse_transport(s: &str) -> Result<Transport> {
    match s.to_lowercase().as_str() {
        "stdio" | "" => Ok(Transport::Stdio),
        "http" => Ok(Transport::Http),
        other => anyhow::bail!("Unknown MCP_TRANSPORT '{}' (expected stdio or http)", other),
    }
}
