use anyhow::Result;
use std::sync::Arc;

use mcp_salesforce::config::{self, Transport};
use mcp_salesforce::mcp::{self, McpServer};
use mcp_salesforce::{middleware, routes, SalesforceClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = config::Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    // stdout belongs to the stdio transport, so logs go to stderr
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Salesforce MCP server starting...");
    tracing::info!(
        instance_url = %config.instance_url,
        api_version = %config.api_version,
        login_url = %config.login_url,
        transport = ?config.transport,
        "Configuration loaded"
    );

    // Token is minted lazily on the first tool call
    let client = Arc::new(SalesforceClient::from_config(&config)?);
    tracing::info!("Salesforce client initialized");

    let server = Arc::new(McpServer::new(client));

    match config.transport {
        Transport::Stdio => mcp::stdio::serve(server).await?,
        Transport::Http => serve_http(server, &config).await?,
    }

    tracing::info!("Shutdown complete");

    Ok(())
}

/// Serve the MCP endpoint over HTTP until a shutdown signal arrives
async fn serve_http(server: Arc<McpServer>, config: &config::Config) -> Result<()> {
    let state = routes::AppState {
        server,
        proxy_api_key: config.proxy_api_key.clone(),
    };

    if state.proxy_api_key.is_none() {
        tracing::warn!("PROXY_API_KEY not set, /mcp is open to anyone who can reach it");
    }

    let app = build_app(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}/mcp", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the application with all routes and middleware
fn build_app(state: routes::AppState) -> axum::Router {
    use axum::Router;

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::mcp_routes(state))
        .layer(middleware::cors_layer())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
