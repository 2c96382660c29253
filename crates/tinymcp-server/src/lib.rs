//! tinymcp server: stdio and HTTP/SSE transports around the tinymcp engine.

pub mod config;
pub mod demo;
pub mod repl;
#[cfg(feature = "sse")]
pub mod session;
pub mod transport;

pub use config::{resolve, HttpConfig, ServeOverrides, ServerConfig, TransportKind};
pub use demo::demo_server;
#[cfg(feature = "sse")]
pub use transport::SseTransport;
pub use transport::StdioTransport;
