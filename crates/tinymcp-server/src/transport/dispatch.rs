//! Background dispatch task shared by the HTTP handlers.
//!
//! Every payload is processed on one task, one at a time, in arrival order.
//! Callers hand over the text plus a reply channel and wait with a timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use tinymcp::{NotificationSink, ProtocolHandler};

struct Job {
    payload: String,
    sink: Option<NotificationSink>,
    reply: oneshot::Sender<Option<String>>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("dispatcher is not running")]
    Closed,
    #[error("no reply within {0:?}")]
    Timeout(Duration),
}

#[derive(Clone)]
pub struct Dispatcher {
    jobs: mpsc::Sender<Job>,
}

impl Dispatcher {
    /// Start the dispatch task. It ends once every `Dispatcher` clone is dropped.
    pub fn spawn(handler: Arc<ProtocolHandler>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (jobs, mut rx) = mpsc::channel::<Job>(capacity.max(1));
        let task = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let reply = handler.handle_raw_with(&job.payload, job.sink).await;
                // The submitter may have timed out and gone away.
                let _ = job.reply.send(reply);
            }
            tracing::debug!("Dispatch task stopped");
        });
        (Self { jobs }, task)
    }

    /// Queue a payload and wait for its serialized reply, if any.
    pub async fn submit(
        &self,
        payload: String,
        sink: Option<NotificationSink>,
        timeout: Duration,
    ) -> Result<Option<String>, DispatchError> {
        let (reply, rx) = oneshot::channel();
        let job = Job {
            payload,
            sink,
            reply,
        };

        let exchange = async {
            self.jobs.send(job).await.map_err(|_| DispatchError::Closed)?;
            rx.await.map_err(|_| DispatchError::Closed)
        };
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| DispatchError::Timeout(timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinymcp::McpServer;

    #[tokio::test]
    async fn test_submit_round_trip() {
        let handler = Arc::new(ProtocolHandler::new(Arc::new(McpServer::new("d"))));
        let (dispatcher, _task) = Dispatcher::spawn(handler, 4);

        let reply = dispatcher
            .submit(
                r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_string(),
                None,
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#));

        let reply = dispatcher
            .submit(
                r#"{"jsonrpc":"2.0","method":"ping"}"#.to_string(),
                None,
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_slow_handler_times_out() {
        let mut server = McpServer::new("slow");
        server
            .tool_async("nap", "", tinymcp::ToolInfo::schema_for(&[]), |_, _| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("awake")
            })
            .unwrap();
        let handler = Arc::new(ProtocolHandler::new(Arc::new(server)));
        let (dispatcher, _task) = Dispatcher::spawn(handler, 4);

        let err = dispatcher
            .submit(
                r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"nap"}}"#.to_string(),
                None,
                Duration::from_millis(50),
            )
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Timeout(Duration::from_millis(50)));
    }
}
