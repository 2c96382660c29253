//! Message framing for newline-delimited JSON.

use tinymcp::protocol::serialize;
use tinymcp::types::{JsonRpcNotification, McpResult};

/// The payload carried by one input line, or `None` for a blank line.
pub fn unframe(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Terminate a serialized message with a newline.
pub fn frame(mut payload: String) -> String {
    payload.push('\n');
    payload
}

pub fn frame_notification(notification: &JsonRpcNotification) -> McpResult<String> {
    serialize(notification).map(frame)
}
