//! Interactive REPL for poking at a server without an MCP client.
//!
//! Launch with `tinymcp-server repl`. Slash commands are turned into
//! JSON-RPC requests and run through the same [`ProtocolHandler`] the
//! transports use; a line starting with `{` or `[` is sent verbatim.

use std::sync::Arc;

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use serde_json::{json, Value};
use tokio::runtime::Handle;

use tinymcp::types::MCP_VERSION;
use tinymcp::ProtocolHandler;

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/info", "Show server name, version, and capabilities"),
    ("/tools", "List registered tools"),
    ("/resources", "List resources and templates"),
    ("/prompts", "List prompts and their arguments"),
    ("/call", "Call a tool: /call <name> [json-args]"),
    ("/read", "Read a resource: /read <uri>"),
    ("/prompt", "Render a prompt: /prompt <name> [json-args]"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// Tab completion for commands and the names they take.
struct McpHelper {
    tools: Vec<String>,
    resources: Vec<String>,
    prompts: Vec<String>,
}

impl McpHelper {
    fn new(handler: &ProtocolHandler) -> Self {
        let server = handler.server();
        Self {
            tools: server.tools().names().map(String::from).collect(),
            resources: server.resources().uris().map(String::from).collect(),
            prompts: server.prompts().names().map(String::from).collect(),
        }
    }

    fn names_for(&self, cmd: &str) -> Option<&[String]> {
        match cmd {
            "/call" => Some(&self.tools),
            "/read" => Some(&self.resources),
            "/prompt" => Some(&self.prompts),
            _ => None,
        }
    }
}

impl Completer for McpHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        let (cmd, arg) = input.split_once(' ').unwrap_or((input, ""));
        // Only the first argument is a name.
        if arg.contains(' ') {
            return Ok((pos, Vec::new()));
        }
        let Some(names) = self.names_for(cmd) else {
            return Ok((pos, Vec::new()));
        };
        let matches: Vec<Pair> = names
            .iter()
            .filter(|name| name.starts_with(arg))
            .map(|name| Pair {
                display: name.clone(),
                replacement: format!("{name} "),
            })
            .collect();
        Ok((input.len() - arg.len(), matches))
    }
}

impl Hinter for McpHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for McpHelper {}
impl Validator for McpHelper {}
impl Helper for McpHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Turn a slash command into a JSON-RPC request.
///
/// `Ok(None)` means the command is local to the REPL.
fn build_request(cmd: &str, args: &str, id: u64) -> Result<Option<Value>, String> {
    let (method, params) = match cmd {
        "tools" => ("tools/list", None),
        "resources" => ("resources/list", None),
        "prompts" => ("prompts/list", None),
        "call" | "prompt" => {
            let (name, rest) = args.split_once(' ').unwrap_or((args, ""));
            if name.is_empty() {
                return Err(format!("Usage: /{cmd} <name> [json-args]"));
            }
            let arguments = parse_json_args(rest)?;
            let method = if cmd == "call" { "tools/call" } else { "prompts/get" };
            (method, Some(json!({ "name": name, "arguments": arguments })))
        }
        "read" => {
            if args.is_empty() {
                return Err("Usage: /read <uri>".to_string());
            }
            ("resources/read", Some(json!({ "uri": args })))
        }
        _ => return Ok(None),
    };

    let mut request = json!({ "jsonrpc": "2.0", "id": id, "method": method });
    if let Some(params) = params {
        request["params"] = params;
    }
    Ok(Some(request))
}

fn parse_json_args(raw: &str) -> Result<Value, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|e| format!("Arguments are not valid JSON: {e}"))
}

struct Session {
    handler: Arc<ProtocolHandler>,
    runtime: Handle,
    next_id: u64,
}

impl Session {
    fn send(&mut self, payload: &str) -> Option<String> {
        self.runtime.block_on(self.handler.handle_raw(payload))
    }

    fn request(&mut self, request: Value) {
        self.next_id += 1;
        match self.send(&request.to_string()) {
            Some(reply) => print_reply(&reply),
            None => eprintln!("  \x1b[90m(no reply)\x1b[0m"),
        }
    }

    fn handshake(&mut self) {
        let init = json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {
                "protocolVersion": MCP_VERSION,
                "clientInfo": { "name": "tinymcp-repl", "version": env!("CARGO_PKG_VERSION") },
            },
        });
        if self.send(&init.to_string()).is_none() {
            tracing::warn!("No reply to initialize");
        }
        let initialized = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
        let _ = self.send(&initialized.to_string());
    }
}

fn print_reply(reply: &str) {
    match serde_json::from_str::<Value>(reply) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{reply}"),
        },
        Err(_) => println!("{reply}"),
    }
}

/// Run the interactive REPL. Blocks the calling thread; async work is
/// driven on `runtime`.
pub fn run(handler: Arc<ProtocolHandler>, runtime: Handle) -> anyhow::Result<()> {
    let server = Arc::clone(handler.server());
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1m{} v{}\x1b[0m \x1b[90m({} tools, {} resources, {} prompts)\x1b[0m",
        server.name(),
        server.version(),
        server.tools().len(),
        server.resources().len(),
        server.prompts().len(),
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<McpHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(McpHelper::new(&handler)));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".tinymcp_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    runtime.block_on(server.run_startup())?;

    let mut session = Session {
        handler,
        runtime: runtime.clone(),
        next_id: 1,
    };
    session.handshake();
    let prompt = " \x1b[36mmcp>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                if line.starts_with('{') || line.starts_with('[') {
                    match session.send(line) {
                        Some(reply) => print_reply(&reply),
                        None => eprintln!("  \x1b[90m(no reply)\x1b[0m"),
                    }
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
                let args = args.trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "info" => cmd_info(&session.handler),
                    _ => match build_request(cmd, args, session.next_id) {
                        Ok(Some(request)) => session.request(request),
                        Ok(None) => {
                            eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                        }
                        Err(usage) => eprintln!("  {usage}"),
                    },
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    runtime.block_on(server.run_shutdown());
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Raw JSON-RPC: type a line starting with '{{' or '['.");
    eprintln!("  Tip: Tab completes commands, tool names, resource URIs, and prompt names.");
    eprintln!();
}

fn cmd_info(handler: &ProtocolHandler) {
    let server = handler.server();
    eprintln!();
    eprintln!("  Server:    {} v{}", server.name(), server.version());
    eprintln!("  Protocol:  {MCP_VERSION}");
    eprintln!("  Tools:     {}", server.tools().len());
    eprintln!("  Resources: {}", server.resources().len());
    eprintln!("  Prompts:   {}", server.prompts().len());
    if let Some(instructions) = server.instructions() {
        eprintln!("  About:     {instructions}");
    }
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_commands() {
        let req = build_request("tools", "", 7).unwrap().unwrap();
        assert_eq!(req["method"], "tools/list");
        assert_eq!(req["id"], 7);
        assert!(req.get("params").is_none());
    }

    #[test]
    fn test_call_with_args() {
        let req = build_request("call", r#"add {"a": 1, "b": 2}"#, 1)
            .unwrap()
            .unwrap();
        assert_eq!(req["method"], "tools/call");
        assert_eq!(req["params"]["name"], "add");
        assert_eq!(req["params"]["arguments"]["b"], 2);
    }

    #[test]
    fn test_call_without_args_sends_empty_object() {
        let req = build_request("prompt", "summarize", 1).unwrap().unwrap();
        assert_eq!(req["method"], "prompts/get");
        assert_eq!(req["params"]["arguments"], json!({}));
    }

    #[test]
    fn test_usage_errors() {
        assert!(build_request("call", "", 1).is_err());
        assert!(build_request("read", "", 1).is_err());
        assert!(build_request("call", "add {not json", 1).is_err());
    }

    #[test]
    fn test_unknown_command_is_local() {
        assert!(build_request("frobnicate", "", 1).unwrap().is_none());
    }
}
