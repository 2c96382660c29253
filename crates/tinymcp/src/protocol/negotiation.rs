//! Handshake state and capability negotiation.

use crate::types::{ClientCapabilities, Implementation, InitializeParams, MCP_VERSION};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    /// `initialize` answered, waiting for `initialized`.
    InitializePending,
    Ready,
}

/// What the client told us during `initialize`.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub client: ClientCapabilities,
    pub client_info: Option<Implementation>,
    pub state: LifecycleState,
}

impl NegotiatedCapabilities {
    /// Record the client's side of the handshake. A differing protocol
    /// version is logged; the server always answers with its own.
    pub fn negotiate(&mut self, params: InitializeParams) {
        match params.protocol_version.as_deref() {
            Some(MCP_VERSION) | None => {}
            Some(requested) => tracing::warn!(
                "Client requested protocol version {requested}, server supports {MCP_VERSION}. Proceeding with server version."
            ),
        }

        match &params.client_info {
            Some(info) => tracing::info!("Initializing for client: {} v{}", info.name, info.version),
            None => tracing::info!("Initializing for unnamed client"),
        }

        tracing::debug!(
            "Client capabilities: [{}]",
            params.capabilities.declared().join(", ")
        );

        if self.state != LifecycleState::Uninitialized {
            tracing::warn!("Repeated initialize request; restarting handshake");
        }
        self.client = params.capabilities;
        self.client_info = params.client_info;
        self.state = LifecycleState::InitializePending;
    }

    pub fn mark_initialized(&mut self) {
        if self.state == LifecycleState::Uninitialized {
            tracing::warn!("Received initialized before initialize");
        }
        self.state = LifecycleState::Ready;
        tracing::info!("MCP handshake complete");
    }

    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }
}
