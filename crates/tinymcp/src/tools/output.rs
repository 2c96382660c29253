//! Conversion of tool handler output into a `tools/call` result.

use serde_json::Value;

use crate::types::{ContentBlock, ToolCallResult};

/// What a tool handler may return.
///
/// Each variant has one fixed way of becoming a [`ToolCallResult`]; see
/// [`ToolOutput::into_result`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// A finished envelope, passed through as is.
    Result(ToolCallResult),
    Blocks(Vec<ContentBlock>),
    Block(ContentBlock),
    Text(String),
    /// Loosely shaped JSON, normalized by shape.
    Json(Value),
}

impl ToolOutput {
    pub fn into_result(self) -> ToolCallResult {
        match self {
            ToolOutput::Result(result) => result,
            ToolOutput::Blocks(blocks) => ToolCallResult::new(blocks),
            ToolOutput::Block(block) => ToolCallResult::new(vec![block]),
            ToolOutput::Text(text) => ToolCallResult::text(text),
            ToolOutput::Json(value) => normalize_json(value),
        }
    }
}

/// `{content: [...]}` passes through (`isError` defaults to false), an array
/// maps element-wise, anything else becomes one text block.
fn normalize_json(value: Value) -> ToolCallResult {
    match value {
        Value::Object(ref map) if map.get("content").is_some_and(Value::is_array) => {
            match serde_json::from_value::<ToolCallResult>(value.clone()) {
                Ok(result) => result,
                Err(e) => {
                    tracing::debug!("Tool result envelope did not decode, stringifying: {e}");
                    ToolCallResult::text(value.to_string())
                }
            }
        }
        Value::Array(items) => ToolCallResult::new(items.into_iter().map(content_item).collect()),
        other => ToolCallResult::new(vec![text_block(other)]),
    }
}

fn content_item(item: Value) -> ContentBlock {
    if item.as_object().is_some_and(|o| o.contains_key("type")) {
        ContentBlock::from_value(item)
    } else {
        text_block(item)
    }
}

/// Strings are used verbatim; other values are rendered as compact JSON.
pub(crate) fn text_block(value: Value) -> ContentBlock {
    ContentBlock::text(render(value))
}

pub(crate) fn render(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl From<ToolCallResult> for ToolOutput {
    fn from(result: ToolCallResult) -> Self {
        ToolOutput::Result(result)
    }
}

impl From<Vec<ContentBlock>> for ToolOutput {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        ToolOutput::Blocks(blocks)
    }
}

impl From<ContentBlock> for ToolOutput {
    fn from(block: ContentBlock) -> Self {
        ToolOutput::Block(block)
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        ToolOutput::Text(text.to_string())
    }
}

impl From<Vec<String>> for ToolOutput {
    fn from(lines: Vec<String>) -> Self {
        ToolOutput::Blocks(lines.into_iter().map(ContentBlock::text).collect())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Json(value)
    }
}

macro_rules! scalar_output {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ToolOutput {
                fn from(v: $t) -> Self {
                    ToolOutput::Text(v.to_string())
                }
            }
        )*
    };
}

scalar_output!(i32, i64, u32, u64, usize, f32, f64, bool);
