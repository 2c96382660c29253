//! Per-call context handed to tool handlers.

use std::sync::Arc;

use crate::types::{
    JsonRpcNotification, ProgressParams, ProgressToken, RequestId, PROGRESS_NOTIFICATION,
};

/// Where server-to-client notifications go.
///
/// The transport decides what "send" means: the stdio transport writes a
/// line, the SSE transport queues an event on the caller's session.
#[derive(Clone)]
pub struct NotificationSink {
    send: Arc<dyn Fn(JsonRpcNotification) -> bool + Send + Sync>,
}

impl NotificationSink {
    pub fn new<F>(send: F) -> Self
    where
        F: Fn(JsonRpcNotification) -> bool + Send + Sync + 'static,
    {
        Self {
            send: Arc::new(send),
        }
    }

    /// Sink backed by an unbounded channel.
    pub fn from_channel(tx: tokio::sync::mpsc::UnboundedSender<JsonRpcNotification>) -> Self {
        Self::new(move |n| tx.send(n).is_ok())
    }

    /// Returns `false` when the receiving side is gone.
    pub fn send(&self, notification: JsonRpcNotification) -> bool {
        (self.send)(notification)
    }
}

impl std::fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NotificationSink")
    }
}

/// Created fresh for each `tools/call` and dropped when the call returns.
#[derive(Debug, Clone)]
pub struct Context {
    request_id: Option<RequestId>,
    server_name: String,
    progress_token: Option<ProgressToken>,
    sink: Option<NotificationSink>,
}

impl Context {
    pub fn new(request_id: Option<RequestId>, server_name: impl Into<String>) -> Self {
        Self {
            request_id,
            server_name: server_name.into(),
            progress_token: None,
            sink: None,
        }
    }

    pub fn with_progress_token(mut self, token: Option<ProgressToken>) -> Self {
        self.progress_token = token;
        self
    }

    pub fn with_sink(mut self, sink: Option<NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// `None` when the call arrived as a notification.
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn debug(&self, msg: &str) {
        tracing::debug!(server = %self.server_name, request = ?self.request_id, "{msg}");
    }

    pub fn info(&self, msg: &str) {
        tracing::info!(server = %self.server_name, request = ?self.request_id, "{msg}");
    }

    pub fn warning(&self, msg: &str) {
        tracing::warn!(server = %self.server_name, request = ?self.request_id, "{msg}");
    }

    pub fn error(&self, msg: &str) {
        tracing::error!(server = %self.server_name, request = ?self.request_id, "{msg}");
    }

    /// Emit a `notifications/progress` message to the client.
    ///
    /// Uses the client's progress token, else the request id. Returns
    /// whether anything was sent.
    pub fn report_progress(&self, progress: f64, total: Option<f64>) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        let token = self
            .progress_token
            .clone()
            .or_else(|| self.request_id.as_ref().and_then(ProgressToken::from_request_id));
        let Some(progress_token) = token else {
            return false;
        };

        let params = ProgressParams {
            progress_token,
            progress,
            total,
        };
        match serde_json::to_value(params) {
            Ok(params) => sink.send(JsonRpcNotification::new(PROGRESS_NOTIFICATION, Some(params))),
            Err(e) => {
                tracing::warn!("Failed to encode progress notification: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_without_sink_is_noop() {
        let ctx = Context::new(Some(RequestId::from(1)), "test");
        assert!(!ctx.report_progress(0.5, Some(1.0)));
    }

    #[test]
    fn test_progress_uses_token_then_request_id() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = NotificationSink::from_channel(tx);

        let ctx = Context::new(Some(RequestId::from(9)), "test")
            .with_progress_token(Some(ProgressToken::String("tok".into())))
            .with_sink(Some(sink.clone()));
        assert!(ctx.report_progress(1.0, Some(4.0)));
        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.method, "notifications/progress");
        let params = sent.params.unwrap();
        assert_eq!(params["progressToken"], "tok");
        assert_eq!(params["total"], 4.0);

        let ctx = Context::new(Some(RequestId::from(9)), "test").with_sink(Some(sink));
        assert!(ctx.report_progress(2.0, None));
        let params = rx.try_recv().unwrap().params.unwrap();
        assert_eq!(params["progressToken"], 9);
        assert!(params.get("total").is_none());
    }

    #[test]
    fn test_null_id_without_token_sends_nothing() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let ctx = Context::new(Some(RequestId::Null), "test")
            .with_sink(Some(NotificationSink::from_channel(tx)));
        assert!(!ctx.report_progress(1.0, None));
    }
}
