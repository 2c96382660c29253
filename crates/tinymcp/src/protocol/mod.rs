//! MCP protocol handling: JSON-RPC codec, handshake state, and dispatch.

pub mod codec;
pub mod handler;
pub mod negotiation;

pub use codec::{parse_message, serialize};
pub use handler::ProtocolHandler;
pub use negotiation::{LifecycleState, NegotiatedCapabilities};
