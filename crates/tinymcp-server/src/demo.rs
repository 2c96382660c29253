//! Built-in capability set so the binary is useful without any code.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use tinymcp::types::{McpResult, PromptArgument};
use tinymcp::{parse_arguments, McpServer, ToolInfo};

pub const DEFAULT_NAME: &str = "tinymcp";

#[derive(Deserialize)]
struct AddArgs {
    a: f64,
    b: f64,
}

#[derive(Deserialize)]
struct SlowArgs {
    #[serde(default = "default_steps")]
    steps: u32,
    #[serde(default = "default_delay_ms")]
    delay_ms: u64,
}

fn default_steps() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    100
}

/// A server named `name` carrying the demo tools, resources, and prompts.
pub fn demo_server(name: &str) -> McpResult<McpServer> {
    let mut server = McpServer::new(name)
        .with_instructions("Demo server: try the echo and add tools, or read config://server.");

    server
        .tool(
            "echo",
            "Echo the given message back",
            ToolInfo::schema_for(&[("message", "string", true)]),
            |args, _ctx| {
                let message = args
                    .get("message")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| anyhow::anyhow!("'message' must be a string"))?;
                Ok(message.to_string())
            },
        )?
        .tool(
            "add",
            "Add two numbers",
            ToolInfo::schema_for(&[("a", "number", true), ("b", "number", true)]),
            |args, _ctx| {
                let AddArgs { a, b } = parse_arguments(args)?;
                Ok(json!(a + b))
            },
        )?
        .tool(
            "fail",
            "Always fails; shows how tool errors are reported",
            ToolInfo::schema_for(&[("reason", "string", false)]),
            |args, _ctx| -> anyhow::Result<String> {
                let reason = args
                    .get("reason")
                    .and_then(|v| v.as_str())
                    .unwrap_or("requested failure");
                anyhow::bail!("{reason}")
            },
        )?
        .tool_async(
            "slow",
            "Count through steps with a delay, reporting progress",
            ToolInfo::schema_for(&[("steps", "integer", false), ("delay_ms", "integer", false)]),
            |args, ctx| async move {
                let SlowArgs { steps, delay_ms } = parse_arguments(args)?;
                for step in 1..=steps {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    ctx.report_progress(f64::from(step), Some(f64::from(steps)));
                }
                ctx.info(&format!("slow finished {steps} steps"));
                Ok::<_, anyhow::Error>(format!("Completed {steps} steps"))
            },
        )?;

    let info = json!({ "name": name, "version": env!("CARGO_PKG_VERSION") });
    server
        .resource(
            "config://server",
            "server_config",
            "Name and version of this server",
            "application/json",
            move |_| Ok(info.clone()),
        )?
        .resource(
            "greeting://{name}",
            "greeting",
            "A personal greeting",
            "text/plain",
            |params| {
                let name = params.get("name").map(String::as_str).unwrap_or("stranger");
                Ok(format!("Hello, {name}!"))
            },
        )?;

    server
        .prompt(
            "review_code",
            "Ask for a review of a piece of code",
            vec![
                PromptArgument::required("code", "The code to review"),
                PromptArgument::optional("language", "Programming language of the code"),
            ],
            |args| {
                let code = args.get("code").and_then(|v| v.as_str()).unwrap_or_default();
                let language = args
                    .get("language")
                    .and_then(|v| v.as_str())
                    .unwrap_or("the following");
                Ok(format!("Please review {language} code:\n\n{code}"))
            },
        )?
        .prompt(
            "summarize",
            "Summarize a text, optionally in a given style",
            vec![
                PromptArgument::required("text", "Text to summarize"),
                PromptArgument::optional("style", "e.g. bullet points"),
            ],
            |args| {
                let text = args.get("text").and_then(|v| v.as_str()).unwrap_or_default();
                let style = args.get("style").and_then(|v| v.as_str()).unwrap_or("a short paragraph");
                Ok(json!([
                    { "role": "user", "content": format!("Summarize the text below as {style}.") },
                    { "role": "user", "content": text },
                ]))
            },
        )?;

    Ok(server)
}
