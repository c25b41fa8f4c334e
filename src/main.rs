//! OpenClaw bridge - HTTP/JSON API over the OpenClaw gateway CLI.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use openclaw_bridge::bridge::{GatewayBridge, LogicalCommand, ResultCache};
use openclaw_bridge::config::{BridgeConfig, ConfigLoader};
use openclaw_bridge::server::BridgeServer;

#[derive(Parser)]
#[command(
    name = "openclaw-bridge",
    about = "HTTP/JSON bridge between the dashboard and the OpenClaw gateway CLI",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a config file (defaults to the standard search paths).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API.
    Serve {
        /// Host address to bind to.
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on.
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one gateway query and print its JSON.
    Query {
        /// CLI arguments, e.g. `agents list`.
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<BridgeConfig, String> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let mut config = loader.load().map_err(|e| e.to_string())?;
    config.apply_env();
    Ok(config)
}

async fn serve(mut config: BridgeConfig, host: Option<String>, port: Option<u16>) -> ExitCode {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!(
        cli = %config.gateway.command,
        platform = ?config.gateway.platform,
        token = !config.gateway.token.is_empty(),
        cors_origins = ?config.server.cors_origins,
        "Starting OpenClaw bridge"
    );

    let server = BridgeServer::from_config(&config);
    let cancel = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C");
            cancel.cancel();
        }
    });

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Bridge server failed");
            ExitCode::FAILURE
        }
    }
}

async fn query(config: &BridgeConfig, args: Vec<String>) -> ExitCode {
    let bridge = GatewayBridge::new(config.command_builder(), Arc::new(ResultCache::new()))
        .with_settings(config.bridge_settings());
    let command = LogicalCommand::new(args);

    match bridge.query(&command, config.bridge_settings().default_ttl).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to render JSON");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            tracing::error!(command = %command, error = %e, "Query failed");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Serve { host, port } => serve(config, host, port).await,
        Commands::Query { args } => query(&config, args).await,
    }
}
