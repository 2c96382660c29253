//! SSE transport: HTTP server with per-client event streams and /health.
//!
//! A client opens `GET <sse_path>` and receives an `endpoint` event naming
//! the URL to POST its messages to. Replies to those POSTs come back on the
//! stream as `message` events, in the order they were produced.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    response::{IntoResponse, Json as AxumJson, Response},
    routing::{get, post},
    Router,
};
use futures::Stream;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use tinymcp::types::{McpError, McpResult};
use tinymcp::ProtocolHandler;

use super::dispatch::Dispatcher;
use crate::config::{HttpConfig, HEALTH_PATH};
use crate::session::{SessionEvent, SessionManager};

/// Shared state passed to all handlers via axum State.
#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
    sessions: Arc<SessionManager>,
    config: Arc<HttpConfig>,
}

/// SSE transport for web-based MCP clients.
pub struct SseTransport {
    handler: Arc<ProtocolHandler>,
    config: HttpConfig,
    sessions: Arc<SessionManager>,
}

impl SseTransport {
    pub fn new(handler: Arc<ProtocolHandler>, config: HttpConfig) -> Self {
        Self {
            handler,
            config,
            sessions: Arc::new(SessionManager::new()),
        }
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.sessions)
    }

    /// Build the router. Spawns the dispatch task, so it must be called
    /// from within a Tokio runtime.
    pub fn router(&self) -> Router {
        let (dispatcher, _task) =
            Dispatcher::spawn(Arc::clone(&self.handler), self.config.queue_capacity);
        let state = AppState {
            dispatcher,
            sessions: Arc::clone(&self.sessions),
            config: Arc::new(self.config.clone()),
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route(&self.config.sse_path, get(handle_sse))
            .route(&self.config.message_path, post(handle_message))
            .route(HEALTH_PATH, get(handle_health))
            .layer(cors)
            .with_state(state)
    }

    /// Run the HTTP server until Ctrl-C, with lifecycle hooks around it.
    pub async fn run(&self) -> McpResult<()> {
        let server = Arc::clone(self.handler.server());
        server.run_startup().await?;

        let app = self.router();
        let addr = self.config.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!(
            "HTTP transport listening on http://{addr} (stream {}, messages {})",
            self.config.sse_path,
            self.config.message_path
        );

        let sessions = Arc::clone(&self.sessions);
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {e}");
                    std::future::pending::<()>().await;
                }
                tracing::info!("Interrupted, closing {} session(s)", sessions.len());
                sessions.close_all();
            })
            .await
            .map_err(|e| McpError::Transport(e.to_string()));

        self.sessions.close_all();
        server.run_shutdown().await;
        result
    }
}

/// Removes the session when its stream is dropped, whether it ended on a
/// close sentinel or the client went away.
struct SessionGuard {
    sessions: Arc<SessionManager>,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
    }
}

async fn handle_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, mut rx) = state.sessions.open();
    let endpoint = format!("{}?session_id={id}", state.config.message_path);
    let keep_alive = state.config.keep_alive;
    let guard = SessionGuard {
        sessions: Arc::clone(&state.sessions),
        id,
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default().event("endpoint").data(endpoint));
        loop {
            match tokio::time::timeout(keep_alive, rx.recv()).await {
                Err(_) => yield Ok(Event::default().comment("keep-alive")),
                Ok(Some(SessionEvent::Message(payload))) => {
                    yield Ok(Event::default().event("message").data(payload));
                }
                Ok(Some(SessionEvent::Close)) | Ok(None) => break,
            }
        }
    };

    Sse::new(stream)
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

/// Accept one JSON-RPC payload for a session. The reply, if any, is queued
/// on the session's stream before the 202 goes out.
async fn handle_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(id) = query.session_id.filter(|id| !id.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing session_id").into_response();
    };
    let Some(sink) = state.sessions.notification_sink(&id) else {
        return (StatusCode::BAD_REQUEST, "Unknown session_id").into_response();
    };

    match state
        .dispatcher
        .submit(body, Some(sink), state.config.dispatch_timeout)
        .await
    {
        Ok(Some(reply)) => {
            if !state.sessions.send(&id, reply) {
                tracing::warn!(session = %id, "Session closed before reply could be queued");
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(session = %id, "Dispatch failed: {e}"),
    }

    (
        StatusCode::ACCEPTED,
        AxumJson(serde_json::json!({ "status": "accepted" })),
    )
        .into_response()
}

/// Health check endpoint.
async fn handle_health(State(state): State<AppState>) -> AxumJson<serde_json::Value> {
    AxumJson(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len(),
    }))
}
