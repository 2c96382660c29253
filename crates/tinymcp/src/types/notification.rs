//! MCP notification types.

use serde::{Deserialize, Serialize};

use super::message::RequestId;

pub const PROGRESS_NOTIFICATION: &str = "notifications/progress";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

impl ProgressToken {
    /// Fall back to the request id when the client sent no explicit token.
    pub fn from_request_id(id: &RequestId) -> Option<Self> {
        match id {
            RequestId::String(s) => Some(ProgressToken::String(s.clone())),
            RequestId::Number(n) => n.as_i64().map(ProgressToken::Number),
            RequestId::Null => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    pub progress_token: ProgressToken,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}
