//! tinymcp server entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use tinymcp::types::MCP_VERSION;
use tinymcp::ProtocolHandler;
use tinymcp_server::config::{self, ServeOverrides, TransportKind};
use tinymcp_server::demo::{demo_server, DEFAULT_NAME};
use tinymcp_server::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "tinymcp-server",
    about = "Minimal MCP server over stdio or HTTP/SSE",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log line format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Server name reported during the handshake.
    #[arg(long, default_value = DEFAULT_NAME, global = true)]
    name: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server (default).
    Serve(ServeArgs),

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   tinymcp-server completions bash > ~/.local/share/bash-completion/completions/tinymcp-server
    ///   tinymcp-server completions zsh > ~/.zfunc/_tinymcp-server
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[derive(clap::Args, Default)]
struct ServeArgs {
    /// Transport: s/stdio or h/http. Also reads TINYMCP_TRANSPORT.
    #[arg(short, long)]
    transport: Option<String>,

    /// HTTP bind host. Also reads TINYMCP_HOST.
    #[arg(long)]
    host: Option<String>,

    /// HTTP bind port. Also reads TINYMCP_PORT.
    #[arg(short, long)]
    port: Option<u16>,

    /// Path of the SSE stream endpoint.
    #[arg(long)]
    sse_path: Option<String>,

    /// Path clients POST messages to.
    #[arg(long)]
    message_path: Option<String>,

    /// Seconds of idle time before an SSE keep-alive comment.
    #[arg(long)]
    keep_alive_secs: Option<u64>,

    /// Seconds a POST waits for its reply before acknowledging anyway.
    #[arg(long)]
    dispatch_timeout_secs: Option<u64>,
}

impl From<ServeArgs> for ServeOverrides {
    fn from(args: ServeArgs) -> Self {
        Self {
            transport: args.transport,
            host: args.host,
            port: args.port,
            sse_path: args.sse_path,
            message_path: args.message_path,
            keep_alive_secs: args.keep_alive_secs,
            dispatch_timeout_secs: args.dispatch_timeout_secs,
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let server = Arc::new(demo_server(&cli.name)?);

    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => {
            let config = config::resolve(&args.into())?;
            let handler = Arc::new(ProtocolHandler::new(server));
            tracing::info!(
                "{} v{} starting ({} transport)",
                handler.server().name(),
                handler.server().version(),
                config.transport
            );

            match config.transport {
                TransportKind::Stdio => StdioTransport::new(handler).run().await?,
                #[cfg(feature = "sse")]
                TransportKind::Http => {
                    tinymcp_server::transport::SseTransport::new(handler, config.http)
                        .run()
                        .await?
                }
                #[cfg(not(feature = "sse"))]
                TransportKind::Http => {
                    anyhow::bail!("HTTP transport not available: built without the 'sse' feature")
                }
            }
        }

        Commands::Info => {
            let info = serde_json::json!({
                "server": server.server_info(),
                "protocol_version": MCP_VERSION,
                "capabilities": server.capabilities(),
                "tools": server.tools().names().collect::<Vec<_>>(),
                "resources": server.resources().uris().collect::<Vec<_>>(),
                "prompts": server.prompts().names().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tinymcp-server", &mut std::io::stdout());
        }

        Commands::Repl => {
            let handler = Arc::new(ProtocolHandler::new(server));
            let runtime = tokio::runtime::Handle::current();
            tokio::task::block_in_place(|| tinymcp_server::repl::run(handler, runtime))?;
        }
    }

    Ok(())
}
