//! Text <-> message conversion with JSON-RPC 2.0 envelope validation.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{
    Incoming, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, McpError, McpResult, RequestId,
    JSONRPC_VERSION,
};

/// Parse one inbound payload.
///
/// A top-level array is a batch whose elements are validated one by one.
pub fn parse_message(raw: &str) -> McpResult<Incoming> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| McpError::ParseError(e.to_string()))?;
    parse_value(value)
}

pub fn parse_value(value: Value) -> McpResult<Incoming> {
    match value {
        Value::Array(items) if items.is_empty() => {
            Err(McpError::InvalidRequest("Empty batch array".to_string()))
        }
        Value::Array(items) => Ok(Incoming::Batch(items.into_iter().map(parse_single).collect())),
        other => parse_single(other).map(Incoming::Single),
    }
}

/// Validate one message object. No `id` key means notification; `id: null`
/// is a request.
pub fn parse_single(value: Value) -> McpResult<JsonRpcMessage> {
    let Value::Object(mut obj) = value else {
        return Err(McpError::InvalidRequest(
            "Message must be a JSON object".to_string(),
        ));
    };

    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        other => {
            return Err(McpError::InvalidRequest(format!(
                "Unsupported jsonrpc version: {}",
                other.map_or_else(|| "missing".to_string(), Value::to_string)
            )))
        }
    }

    let method = match obj.remove("method") {
        Some(Value::String(m)) => m,
        _ => {
            return Err(McpError::InvalidRequest(
                "'method' must be a string".to_string(),
            ))
        }
    };

    let params = match obj.remove("params") {
        None | Some(Value::Null) => None,
        Some(p @ (Value::Object(_) | Value::Array(_))) => Some(p),
        Some(_) => {
            return Err(McpError::InvalidRequest(
                "'params' must be an object or array".to_string(),
            ))
        }
    };

    let Some(raw_id) = obj.remove("id") else {
        return Ok(JsonRpcMessage::Notification(JsonRpcNotification::new(
            method, params,
        )));
    };
    let id = RequestId::from_value(raw_id).ok_or_else(|| {
        McpError::InvalidRequest("'id' must be a string, number, or null".to_string())
    })?;

    Ok(JsonRpcMessage::Request(JsonRpcRequest::new(id, method, params)))
}

/// Compact JSON, no trailing newline.
pub fn serialize<T: Serialize>(message: &T) -> McpResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Params as an object, treating absent params as empty.
pub(crate) fn params_object(params: Option<Value>) -> McpResult<Map<String, Value>> {
    match params {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(McpError::InvalidParams(
            "params must be an object".to_string(),
        )),
    }
}
