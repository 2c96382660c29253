//! Conversion of prompt handler output into prompt messages.

use serde_json::Value;

use crate::tools::output::{render, text_block};
use crate::types::{ContentBlock, PromptMessage};

#[derive(Debug, Clone, PartialEq)]
pub enum PromptOutput {
    Messages(Vec<PromptMessage>),
    Message(PromptMessage),
    /// A single user message.
    Text(String),
    Json(Value),
}

impl PromptOutput {
    pub fn into_messages(self) -> Vec<PromptMessage> {
        match self {
            PromptOutput::Messages(messages) => messages,
            PromptOutput::Message(message) => vec![message],
            PromptOutput::Text(text) => vec![PromptMessage::user(text)],
            PromptOutput::Json(Value::Array(items)) => items.into_iter().map(message_from).collect(),
            PromptOutput::Json(value) => vec![message_from(value)],
        }
    }
}

/// Objects supply `role` (default `user`) and `content`; anything else
/// becomes a user text message.
fn message_from(value: Value) -> PromptMessage {
    let Value::Object(mut map) = value else {
        return PromptMessage::user(render(value));
    };
    let role = match map.remove("role") {
        Some(Value::String(role)) => role,
        _ => "user".to_string(),
    };
    let content = match map.remove("content") {
        None => ContentBlock::text(""),
        Some(obj @ Value::Object(_)) => ContentBlock::from_value(obj),
        Some(other) => text_block(other),
    };
    PromptMessage { role, content }
}

impl From<Vec<PromptMessage>> for PromptOutput {
    fn from(messages: Vec<PromptMessage>) -> Self {
        PromptOutput::Messages(messages)
    }
}

impl From<PromptMessage> for PromptOutput {
    fn from(message: PromptMessage) -> Self {
        PromptOutput::Message(message)
    }
}

impl From<String> for PromptOutput {
    fn from(text: String) -> Self {
        PromptOutput::Text(text)
    }
}

impl From<&str> for PromptOutput {
    fn from(text: &str) -> Self {
        PromptOutput::Text(text.to_string())
    }
}

impl From<Value> for PromptOutput {
    fn from(value: Value) -> Self {
        PromptOutput::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_string_is_user_message() {
        let messages = PromptOutput::from("Review this").into_messages();
        assert_eq!(messages, vec![PromptMessage::user("Review this")]);
    }

    #[test]
    fn test_object_defaults_role_and_wraps_string_content() {
        let messages = PromptOutput::from(json!({ "content": "hi" })).into_messages();
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, ContentBlock::text("hi"));
    }

    #[test]
    fn test_list_mixes_shapes() {
        let raw = json!([
            { "role": "assistant", "content": { "type": "text", "text": "ok" } },
            "plain",
            3,
            { "role": "user", "content": { "type": "image", "data": "AA", "mimeType": "image/png" } }
        ]);
        let messages = PromptOutput::from(raw).into_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], PromptMessage::assistant("ok"));
        assert_eq!(messages[1], PromptMessage::user("plain"));
        assert_eq!(messages[2], PromptMessage::user("3"));
        assert_eq!(messages[3].content, ContentBlock::image("AA", "image/png"));
    }

    #[test]
    fn test_single_message_is_one_element_list() {
        let messages = PromptOutput::from(PromptMessage::assistant("x")).into_messages();
        assert_eq!(messages.len(), 1);
    }
}
