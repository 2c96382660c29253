//! SSE session tracking: one outbound queue per connected stream.

use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use tinymcp::protocol::serialize;
use tinymcp::NotificationSink;

/// What a session's SSE stream receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A serialized JSON-RPC message, sent as an `event: message`.
    Message(String),
    /// Ends the stream.
    Close,
}

/// Sessions by id. Queues are unbounded and FIFO; many producers may push
/// to a session while its stream is the single consumer.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: DashMap<String, UnboundedSender<SessionEvent>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session and return its id with the receiving end of its queue.
    pub fn open(&self) -> (String, UnboundedReceiver<SessionEvent>) {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.insert(id.clone(), tx);
        tracing::info!(session = %id, "SSE session opened");
        (id, rx)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Queue a payload. Returns `false` for unknown or already-closed sessions.
    pub fn send(&self, id: &str, payload: String) -> bool {
        self.push(id, SessionEvent::Message(payload))
    }

    /// Ask the session's stream to end.
    pub fn close(&self, id: &str) -> bool {
        self.push(id, SessionEvent::Close)
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "SSE session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Push the close sentinel to every session.
    pub fn close_all(&self) {
        for entry in self.sessions.iter() {
            let _ = entry.value().send(SessionEvent::Close);
        }
    }

    /// Sink that delivers server-to-client notifications on this session.
    pub fn notification_sink(&self, id: &str) -> Option<NotificationSink> {
        let tx = self.sessions.get(id)?.value().clone();
        Some(NotificationSink::new(move |notification| {
            match serialize(&notification) {
                Ok(text) => tx.send(SessionEvent::Message(text)).is_ok(),
                Err(e) => {
                    tracing::warn!("Dropping unserializable notification: {e}");
                    false
                }
            }
        }))
    }

    fn push(&self, id: &str, event: SessionEvent) -> bool {
        match self.sessions.get(id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}
