//! Stdio transport: reads JSON-RPC from stdin, writes to stdout.
//!
//! Stdin is read on a dedicated OS thread so a blocking read never stalls
//! the runtime. Lines cross to the dispatch loop over a bounded channel.

use std::io::BufRead;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use tinymcp::types::{JsonRpcNotification, McpError, McpResult};
use tinymcp::{NotificationSink, ProtocolHandler};

use super::framing;
use crate::config::DEFAULT_QUEUE_CAPACITY;

enum Inbound {
    Line(String),
    /// End of input or a read failure.
    Eof,
}

/// Stdio transport for desktop MCP clients.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
    queue_capacity: usize,
}

impl StdioTransport {
    pub fn new(handler: Arc<ProtocolHandler>) -> Self {
        Self {
            handler,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Run the transport loop on the process stdin and stdout.
    pub async fn run(&self) -> McpResult<()> {
        let mut stdout = tokio::io::stdout();
        self.run_with(std::io::stdin(), &mut stdout).await
    }

    /// Serve newline-delimited messages from `input` until it ends or the
    /// process is interrupted. Lifecycle hooks run around the loop.
    pub async fn run_with<R, W>(&self, input: R, output: &mut W) -> McpResult<()>
    where
        R: std::io::Read + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        self.handler.server().run_startup().await?;

        let (tx, mut lines) = mpsc::channel(self.queue_capacity.max(1));
        spawn_reader(input, tx)?;

        tracing::info!("Stdio transport started");
        let result = self.serve(&mut lines, output).await;
        self.handler.server().run_shutdown().await;
        result
    }

    async fn serve<W>(&self, lines: &mut mpsc::Receiver<Inbound>, output: &mut W) -> McpResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let (note_tx, mut notes) = mpsc::unbounded_channel();
        let sink = NotificationSink::from_channel(note_tx);

        loop {
            let inbound = tokio::select! {
                inbound = lines.recv() => inbound.unwrap_or(Inbound::Eof),
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, shutting down");
                    return Ok(());
                }
            };

            let line = match inbound {
                Inbound::Line(line) => line,
                Inbound::Eof => {
                    tracing::info!("EOF on stdin, shutting down");
                    return Ok(());
                }
            };
            let Some(payload) = framing::unframe(&line) else {
                continue;
            };

            // Progress notifications go out while the call is still running.
            let reply = {
                let call = self.handler.handle_raw_with(payload, Some(sink.clone()));
                tokio::pin!(call);
                loop {
                    tokio::select! {
                        biased;
                        reply = &mut call => break reply,
                        Some(note) = notes.recv() => write_notification(output, &note).await?,
                    }
                }
            };
            while let Ok(note) = notes.try_recv() {
                write_notification(output, &note).await?;
            }

            if let Some(text) = reply {
                write_line(output, framing::frame(text)).await?;
            }
        }
    }
}

fn spawn_reader<R>(input: R, tx: mpsc::Sender<Inbound>) -> McpResult<()>
where
    R: std::io::Read + Send + 'static,
{
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let reader = std::io::BufReader::new(input);
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(Inbound::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read stdin: {e}");
                        break;
                    }
                }
            }
            let _ = tx.blocking_send(Inbound::Eof);
        })
        .map(|_| ())
        .map_err(McpError::Io)
}

async fn write_notification<W>(output: &mut W, notification: &JsonRpcNotification) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    write_line(output, framing::frame_notification(notification)?).await
}

async fn write_line<W>(output: &mut W, line: String) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(line.as_bytes()).await.map_err(McpError::Io)?;
    output.flush().await.map_err(McpError::Io)
}
