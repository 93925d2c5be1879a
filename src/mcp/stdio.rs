// Newline-delimited JSON-RPC over stdin/stdout

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::McpServer;

/// Serve MCP on the process stdin/stdout until stdin closes
pub async fn serve(server: Arc<McpServer>) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve_io(server, stdin, stdout).await
}

/// Serve MCP over any line-oriented reader/writer pair
///
/// Messages are handled one at a time, in arrival order.
pub async fn serve_io<R, W>(server: Arc<McpServer>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tracing::info!("MCP stdio transport ready");
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(response) = server.handle_message(line).await {
            let mut out = serde_json::to_string(&response).context("Failed to encode response")?;
            out.push('\n');
            writer
                .write_all(out.as_bytes())
                .await
                .context("Failed to write to stdout")?;
            writer.flush().await.context("Failed to flush stdout")?;
        }
    }

    tracing::info!("stdin closed, stopping MCP stdio transport");
    Ok(())
}
