//! Ouster Lidar MCP Server: entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use ouster_lidar::{OusterHttpConnector, SensorConnector, SimulatedConnector};
use ouster_lidar_mcp::config::{ConfigOverrides, ServerConfig};
use ouster_lidar_mcp::protocol::ProtocolHandler;
use ouster_lidar_mcp::session::LidarSession;
use ouster_lidar_mcp::tools::ToolRegistry;
use ouster_lidar_mcp::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "ouster-lidar-mcp",
    about = "MCP server for Ouster Lidar sensors",
    version
)]
struct Cli {
    /// Serve over HTTP with Server-Sent Events instead of stdio.
    #[cfg(feature = "sse")]
    #[arg(long)]
    sse: bool,

    /// HTTP listen host. Also reads MCP_HOST.
    #[arg(long)]
    host: Option<String>,

    /// HTTP listen port. Also reads MCP_PORT.
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug logging (same as --log-level debug).
    #[arg(long)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Use simulated sensors instead of real hardware.
    #[arg(long)]
    simulate: bool,

    /// Seconds to wait for a sensor to connect. Also reads OUSTER_CONNECT_TIMEOUT.
    #[arg(long)]
    connect_timeout: Option<f64>,

    /// Seconds to wait for one complete scan. Also reads OUSTER_CAPTURE_TIMEOUT.
    #[arg(long)]
    capture_timeout: Option<f64>,

    /// Bearer token required by the HTTP transport. Also reads OUSTER_MCP_TOKEN.
    #[arg(long)]
    token: Option<String>,

    /// Command used by discover_sensors. Also reads OUSTER_DISCOVER_CMD.
    #[arg(long)]
    discover_command: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server (default).
    Serve,

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   ouster-lidar-mcp completions bash > ~/.local/share/bash-completion/completions/ouster-lidar-mcp
    ///   ouster-lidar-mcp completions zsh > ~/.zfunc/_ouster-lidar-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    let level = if cli.debug { "debug" } else { cli.log_level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.take() {
        None | Some(Commands::Serve) => serve(cli).await?,

        Some(Commands::Info) => {
            let capabilities = ouster_lidar_mcp::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "ouster-lidar-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn serve(cli: Cli) -> anyhow::Result<()> {
    let config = ServerConfig::resolve(ConfigOverrides {
        host: cli.host,
        port: cli.port,
        connect_timeout_secs: cli.connect_timeout,
        capture_timeout_secs: cli.capture_timeout,
        discover_command: cli.discover_command,
        token: cli.token,
    });

    let connector: Arc<dyn SensorConnector> = if cli.simulate {
        tracing::info!("Using simulated sensors");
        Arc::new(SimulatedConnector::new())
    } else {
        Arc::new(OusterHttpConnector::new(config.connect_timeout))
    };

    let session = Arc::new(LidarSession::new(connector, &config));
    let handler = Arc::new(ProtocolHandler::new(session.clone()));

    tracing::info!(
        "Ouster Lidar MCP server v{} (connect timeout {:?}, capture timeout {:?})",
        env!("CARGO_PKG_VERSION"),
        config.connect_timeout,
        config.capture_timeout
    );

    #[cfg(feature = "sse")]
    if cli.sse {
        use ouster_lidar_mcp::transport::SseTransport;

        if config.token.is_some() {
            tracing::info!("Auth: bearer token required");
        }
        let transport = SseTransport::new(handler, config.token.clone());
        transport.run(&config.listen_addr(), shutdown_signal()).await?;
        session.shutdown().await;
        return Ok(());
    }

    let transport = StdioTransport::new(handler);
    tokio::select! {
        result = transport.run() => result?,
        _ = shutdown_signal() => tracing::info!("Received shutdown signal"),
    }
    session.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
