//! tinymcp: a small Model Context Protocol engine.
//!
//! Register tools, resources, and prompts on an [`McpServer`], freeze it in
//! an `Arc`, and hand it to a [`ProtocolHandler`]. The handler turns raw
//! JSON-RPC text into replies; moving bytes in and out is up to the caller.

pub mod callback;
pub mod context;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod types;

pub use callback::Callback;
pub use context::{Context, NotificationSink};
pub use prompts::{PromptInfo, PromptOutput};
pub use protocol::ProtocolHandler;
pub use resources::{ResourceInfo, ResourceOutput};
pub use server::{Hook, McpServer};
pub use tools::{parse_arguments, Arguments, ToolInfo, ToolOutput};
pub use types::{McpError, McpResult};
