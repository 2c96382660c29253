//! Per-client SSE sessions.

pub mod manager;

pub use manager::{SessionEvent, SessionManager};
