//! Stdio transport: reads JSON-RPC from stdin, writes to stdout.
//!
//! Each message is handled on its own task so a slow sensor call does not
//! hold up requests for other sensors. Responses and progress notifications
//! are written by a single writer task, one line each, in completion order.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult};

use super::framing;

/// Stdio transport for desktop MCP clients.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
}

impl StdioTransport {
    pub fn new(handler: Arc<ProtocolHandler>) -> Self {
        Self { handler }
    }

    /// Serve stdin/stdout until EOF.
    pub async fn run(&self) -> McpResult<()> {
        tracing::info!("Stdio transport started");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve any line-oriented reader and writer until the reader hits EOF,
    /// then wait for in-flight requests to answer.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> McpResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        let writer_task = tokio::spawn(write_responses(rx, writer));

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match framing::parse_message(&line) {
                Ok(msg) => {
                    let handler = self.handler.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        if let Some(response) = handler.handle_message_with(msg, Some(tx.clone())).await {
                            let _ = tx.send(response);
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("Unreadable message: {e}");
                    let _ = tx.send(framing::unreadable_message_response(&e));
                }
            }
        }

        tracing::info!("EOF on input, draining in-flight requests");
        drop(tx);
        writer_task
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?
    }
}

async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<Value>, mut writer: W) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let framed = framing::frame_message(&response)?;
        writer.write_all(framed.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
