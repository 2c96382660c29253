//! Dispatcher integration tests driven through the byte-level entry point.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use tinymcp::types::*;
use tinymcp::{McpServer, NotificationSink, ProtocolHandler, ToolInfo};
use tinymcp_server::demo_server;

// ─────────────────────── helpers ───────────────────────

fn demo_handler() -> ProtocolHandler {
    ProtocolHandler::new(Arc::new(demo_server("test-server").unwrap()))
}

/// Build an MCP JSON-RPC request.
fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

fn init_request() -> Value {
    mcp_request(
        0,
        "initialize",
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}

/// Send raw text and decode the reply, if any.
async fn send_raw(handler: &ProtocolHandler, raw: &str) -> Option<Value> {
    handler
        .handle_raw(raw)
        .await
        .map(|text| serde_json::from_str(&text).unwrap())
}

async fn send(handler: &ProtocolHandler, msg: Value) -> Option<Value> {
    send_raw(handler, &msg.to_string()).await
}

async fn send_unwrap(handler: &ProtocolHandler, msg: Value) -> Value {
    send(handler, msg).await.expect("expected response")
}

async fn call_tool(handler: &ProtocolHandler, name: &str, arguments: Value) -> Value {
    let resp = send_unwrap(
        handler,
        mcp_request(5, "tools/call", json!({ "name": name, "arguments": arguments })),
    )
    .await;
    assert!(resp.get("error").is_none(), "tool call failed: {resp}");
    resp["result"].clone()
}

// ═══════════════════════════════════════════════════════
// ENVELOPE
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_request_gets_exactly_one_reply_with_same_id() {
    let handler = demo_handler();
    for id in [json!(1), json!("abc"), json!(null)] {
        let resp = send_unwrap(
            &handler,
            json!({ "jsonrpc": "2.0", "id": id, "method": "ping" }),
        )
        .await;
        assert_eq!(resp["id"], id);
        assert_eq!(resp["result"], json!({}));
        assert_eq!(resp["jsonrpc"], "2.0");
    }
}

#[tokio::test]
async fn test_notifications_never_reply() {
    let handler = demo_handler();
    for method in ["notifications/initialized", "nope", "tools/list", "notifications/cancelled"] {
        let reply = send(&handler, json!({ "jsonrpc": "2.0", "method": method })).await;
        assert!(reply.is_none(), "{method} produced a reply");
    }
}

#[tokio::test]
async fn test_malformed_json_is_parse_error_with_null_id() {
    let handler = demo_handler();
    let resp = send_raw(&handler, r#"{"broken":"#).await.unwrap();
    assert_eq!(resp["error"]["code"], -32700);
    assert_eq!(resp["error"]["message"], "Parse error");
    assert_eq!(resp["id"], Value::Null);
}

#[tokio::test]
async fn test_invalid_envelopes() {
    let handler = demo_handler();
    let cases = [
        r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#,
        r#"{"id":1,"method":"ping"}"#,
        r#"{"jsonrpc":"2.0","id":1,"method":42}"#,
        r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":"x"}"#,
        r#"{"jsonrpc":"2.0","id":{"a":1},"method":"ping"}"#,
        r#"42"#,
        r#"[]"#,
    ];
    for raw in cases {
        let resp = send_raw(&handler, raw).await.unwrap();
        assert_eq!(resp["error"]["code"], -32600, "{raw} -> {resp}");
        assert_eq!(resp["id"], Value::Null);
    }
}

#[tokio::test]
async fn test_unknown_method() {
    let handler = demo_handler();
    let resp = send_unwrap(&handler, mcp_request(3, "nope/nothing", json!({}))).await;
    assert_eq!(resp["id"], 3);
    assert_eq!(resp["error"]["code"], -32601);
}

#[tokio::test]
async fn test_null_params_treated_as_absent() {
    let handler = demo_handler();
    let resp = send_raw(&handler, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":null}"#)
        .await
        .unwrap();
    assert!(resp["result"]["tools"].is_array());
}

#[tokio::test]
async fn test_codec_round_trip_keeps_notifications() {
    let raw = r#"{"jsonrpc":"2.0","method":"notifications/progress","params":{"progress":1}}"#;
    let parsed = tinymcp::protocol::parse_message(raw).unwrap();
    let Incoming::Single(JsonRpcMessage::Notification(n)) = parsed else {
        panic!("expected a single notification");
    };
    let text = serde_json::to_string(&n).unwrap();
    let back: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(back, serde_json::from_str::<Value>(raw).unwrap());
    assert!(back.get("id").is_none());
}

// ═══════════════════════════════════════════════════════
// BATCHES
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_batch_drops_notification_entries() {
    let handler = demo_handler();
    let batch = json!([
        { "jsonrpc": "2.0", "id": 1, "method": "ping" },
        { "jsonrpc": "2.0", "method": "nope" },
    ]);
    let resp = send_unwrap(&handler, batch).await;
    let items = resp.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], 1);
    assert_eq!(items[0]["result"], json!({}));
}

#[tokio::test]
async fn test_batch_of_notifications_is_silent() {
    let handler = demo_handler();
    let batch = json!([
        { "jsonrpc": "2.0", "method": "notifications/initialized" },
        { "jsonrpc": "2.0", "method": "nope" },
    ]);
    assert!(send(&handler, batch).await.is_none());
}

#[tokio::test]
async fn test_batch_with_malformed_element_still_serves_siblings() {
    let handler = demo_handler();
    let batch = json!([
        { "jsonrpc": "2.0", "id": 1, "method": "ping" },
        { "id": 2, "method": "ping" },
        { "jsonrpc": "2.0", "id": 3, "method": "tools/list" },
    ]);
    let resp = send_unwrap(&handler, batch).await;
    let items = resp.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["id"], 1);
    assert_eq!(items[1]["error"]["code"], -32600);
    assert_eq!(items[1]["id"], Value::Null);
    assert_eq!(items[2]["id"], 3);
    assert!(items[2]["result"]["tools"].is_array());
}

// ═══════════════════════════════════════════════════════
// LIFECYCLE
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_handshake_reports_server_and_capabilities() {
    let handler = demo_handler();
    let resp = send_unwrap(&handler, init_request()).await;
    let result = &resp["result"];
    assert_eq!(result["protocolVersion"], MCP_VERSION);
    assert_eq!(result["serverInfo"]["name"], "test-server");
    assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    assert_eq!(result["capabilities"]["resources"]["subscribe"], false);
    assert_eq!(result["capabilities"]["prompts"]["listChanged"], false);
    assert!(result["instructions"].is_string());
}

#[tokio::test]
async fn test_empty_groups_not_advertised() {
    let mut server = McpServer::new("tools-only");
    server
        .tool("noop", "Nothing", json!({ "type": "object" }), |_, _| Ok("ok"))
        .unwrap();
    let handler = ProtocolHandler::new(Arc::new(server));
    let resp = send_unwrap(&handler, init_request()).await;
    let caps = &resp["result"]["capabilities"];
    assert!(caps.get("tools").is_some());
    assert!(caps.get("resources").is_none());
    assert!(caps.get("prompts").is_none());
}

#[tokio::test]
async fn test_version_mismatch_and_bad_params_tolerated() {
    let handler = demo_handler();
    let resp = send_unwrap(
        &handler,
        mcp_request(1, "initialize", json!({ "protocolVersion": "1999-01-01" })),
    )
    .await;
    assert_eq!(resp["result"]["protocolVersion"], MCP_VERSION);

    let resp = send_unwrap(&handler, mcp_request(2, "initialize", json!({ "capabilities": 7 }))).await;
    assert!(resp.get("result").is_some());
}

#[tokio::test]
async fn test_requests_served_before_handshake() {
    let handler = demo_handler();
    let result = call_tool(&handler, "echo", json!({ "message": "early" })).await;
    assert_eq!(result["content"][0]["text"], "early");
}

// ═══════════════════════════════════════════════════════
// TOOLS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_tools_list_in_registration_order() {
    let handler = demo_handler();
    let resp = send_unwrap(&handler, mcp_request(1, "tools/list", json!({}))).await;
    let names: Vec<_> = resp["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["echo", "add", "fail", "slow"]);
    let add = &resp["result"]["tools"][1];
    assert_eq!(add["inputSchema"]["required"], json!(["a", "b"]));
}

#[tokio::test]
async fn test_tool_call_success() {
    let handler = demo_handler();
    let result = call_tool(&handler, "add", json!({ "a": 1, "b": 2 })).await;
    assert_eq!(result["isError"], false);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert_eq!(text.parse::<f64>().unwrap(), 3.0);
}

#[tokio::test]
async fn test_failing_tool_is_error_envelope_not_rpc_error() {
    let handler = demo_handler();
    let result = call_tool(&handler, "fail", json!({ "reason": "boom" })).await;
    assert_eq!(result["isError"], true);
    assert_eq!(result["content"][0]["type"], "text");
    assert!(result["content"][0]["text"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_panicking_tool_is_error_envelope() {
    let mut server = McpServer::new("panicky");
    server
        .tool("explode", "Panics", ToolInfo::schema_for(&[]), |_, _| -> anyhow::Result<String> {
            panic!("kaboom")
        })
        .unwrap();
    let handler = ProtocolHandler::new(Arc::new(server));
    let result = call_tool(&handler, "explode", json!({})).await;
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"].as_str().unwrap().contains("kaboom"));
}

#[tokio::test]
async fn test_tool_call_param_errors() {
    let handler = demo_handler();

    let resp = send_unwrap(&handler, mcp_request(1, "tools/call", json!({ "name": "missing" }))).await;
    assert_eq!(resp["error"]["code"], -32601);
    assert!(resp["error"]["message"].as_str().unwrap().contains("missing"));

    let resp = send_unwrap(&handler, mcp_request(2, "tools/call", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32602);

    let resp = send_unwrap(
        &handler,
        mcp_request(3, "tools/call", json!({ "name": "echo", "arguments": [1, 2] })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);

    let resp = send_unwrap(&handler, mcp_request(4, "tools/call", json!(["echo"]))).await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn test_progress_notifications_reach_sink() {
    let handler = demo_handler();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink = NotificationSink::from_channel(tx);

    let request = json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "tools/call",
        "params": {
            "name": "slow",
            "arguments": { "steps": 2, "delay_ms": 1 },
            "_meta": { "progressToken": "tok" }
        }
    });
    let reply = handler
        .handle_raw_with(&request.to_string(), Some(sink))
        .await
        .unwrap();
    let reply: Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(reply["result"]["content"][0]["text"], "Completed 2 steps");

    let mut progress = Vec::new();
    while let Ok(note) = rx.try_recv() {
        assert_eq!(note.method, PROGRESS_NOTIFICATION);
        let params = note.params.unwrap();
        assert_eq!(params["progressToken"], "tok");
        assert_eq!(params["total"].as_f64(), Some(2.0));
        progress.push(params["progress"].as_f64().unwrap());
    }
    assert_eq!(progress, vec![1.0, 2.0]);
}

// ═══════════════════════════════════════════════════════
// RESOURCES
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_resource_lists_split_templates() {
    let handler = demo_handler();
    let resp = send_unwrap(&handler, mcp_request(1, "resources/list", json!({}))).await;
    let resources = resp["result"]["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["uri"], "config://server");
    assert_eq!(resources[0]["mimeType"], "application/json");

    let resp = send_unwrap(&handler, mcp_request(2, "resources/templates/list", json!({}))).await;
    let templates = resp["result"]["resourceTemplates"].as_array().unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0]["uriTemplate"], "greeting://{name}");
}

#[tokio::test]
async fn test_read_static_and_template() {
    let handler = demo_handler();
    let resp = send_unwrap(&handler, mcp_request(1, "resources/read", json!({ "uri": "config://server" }))).await;
    let entry = &resp["result"]["contents"][0];
    assert_eq!(entry["uri"], "config://server");
    let body: Value = serde_json::from_str(entry["text"].as_str().unwrap()).unwrap();
    assert_eq!(body["name"], "test-server");

    let resp = send_unwrap(&handler, mcp_request(2, "resources/read", json!({ "uri": "greeting://ada" }))).await;
    assert_eq!(resp["result"]["contents"][0]["text"], "Hello, ada!");
    assert_eq!(resp["result"]["contents"][0]["uri"], "greeting://ada");
}

#[tokio::test]
async fn test_template_params_do_not_cross_segments() {
    let mut server = McpServer::new("weather");
    server
        .resource("weather://{city}/current", "weather", "Current weather", "text/plain", |p| {
            Ok(format!("sunny in {}", p["city"]))
        })
        .unwrap();
    let handler = ProtocolHandler::new(Arc::new(server));

    let resp = send_unwrap(
        &handler,
        mcp_request(1, "resources/read", json!({ "uri": "weather://paris/current" })),
    )
    .await;
    assert_eq!(resp["result"]["contents"][0]["text"], "sunny in paris");

    for uri in ["weather://paris/", "weather://a/b/current"] {
        let resp = send_unwrap(&handler, mcp_request(2, "resources/read", json!({ "uri": uri }))).await;
        assert_eq!(resp["error"]["code"], -32601, "{uri} should not match");
    }
}

#[tokio::test]
async fn test_resource_handler_failure_is_internal_error() {
    let mut server = McpServer::new("broken");
    server
        .resource("data://bad", "bad", "Always fails", "text/plain", |_| -> anyhow::Result<String> {
            anyhow::bail!("disk on fire")
        })
        .unwrap();
    let handler = ProtocolHandler::new(Arc::new(server));
    let resp = send_unwrap(&handler, mcp_request(1, "resources/read", json!({ "uri": "data://bad" }))).await;
    assert_eq!(resp["error"]["code"], -32603);
    assert!(resp["error"]["message"].as_str().unwrap().contains("disk on fire"));

    let resp = send_unwrap(&handler, mcp_request(2, "resources/read", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32602);
}

// ═══════════════════════════════════════════════════════
// PROMPTS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_prompt_list_and_get() {
    let handler = demo_handler();
    let resp = send_unwrap(&handler, mcp_request(1, "prompts/list", json!({}))).await;
    let review = &resp["result"]["prompts"][0];
    assert_eq!(review["name"], "review_code");
    assert_eq!(review["arguments"][0]["required"], true);
    assert_eq!(review["arguments"][1]["required"], false);

    let resp = send_unwrap(
        &handler,
        mcp_request(
            2,
            "prompts/get",
            json!({ "name": "review_code", "arguments": { "code": "fn main() {}", "language": "Rust" } }),
        ),
    )
    .await;
    let message = &resp["result"]["messages"][0];
    assert_eq!(message["role"], "user");
    assert_eq!(message["content"]["type"], "text");
    assert!(message["content"]["text"].as_str().unwrap().contains("Rust"));
}

#[tokio::test]
async fn test_prompt_returning_list_keeps_order() {
    let handler = demo_handler();
    let resp = send_unwrap(
        &handler,
        mcp_request(1, "prompts/get", json!({ "name": "summarize", "arguments": { "text": "abc" } })),
    )
    .await;
    let messages = resp["result"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["content"]["text"], "abc");
}

#[tokio::test]
async fn test_prompt_errors() {
    let handler = demo_handler();
    let resp = send_unwrap(&handler, mcp_request(1, "prompts/get", json!({ "name": "review_code" }))).await;
    assert_eq!(resp["error"]["code"], -32602);
    assert!(resp["error"]["message"].as_str().unwrap().contains("code"));

    let resp = send_unwrap(&handler, mcp_request(2, "prompts/get", json!({ "name": "ghost" }))).await;
    assert_eq!(resp["error"]["code"], -32601);
}
