//! glonax-agent - Telemetry agent for Glonax control units
//!
//! Connects to a control unit, logs its telemetry, and sends one-shot
//! control commands.

mod command;
mod config;
mod telemetry;

use clap::{Parser, Subcommand};
use command::{parse_control, ControlKind};
use config::Config;
use glonax_client::{Client, ClientError, ReceiveError, ServiceHandler};
use std::path::PathBuf;
use std::sync::Arc;
use telemetry::TelemetryLogger;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glonax-agent")]
#[command(about = "Telemetry agent for Glonax machine control units")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, env = "GLONAX_CONFIG")]
    config: Option<PathBuf>,

    /// Control unit address, overrides the configuration
    #[arg(short, long)]
    address: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log telemetry until interrupted (default)
    Listen,
    /// Measure round trip latency
    Ping {
        /// Number of probes
        #[arg(short = 'n', long, default_value_t = 4)]
        count: u32,
    },
    /// Send a single control command
    Control {
        #[arg(value_enum)]
        kind: ControlKind,
        /// on/off for switches, RPM for engine-request
        value: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };
    if let Some(address) = cli.address {
        config.glonax.address = address;
    }

    let conn_config = config.connection_config();
    tracing::info!("Connecting to {}", conn_config.address);
    let client = Arc::new(Client::connect(conn_config).await?);

    tracing::info!("  Instance: {}", client.instance().id);
    tracing::info!("  Model: {}", client.instance().model);
    tracing::info!("  Machine type: {}", client.instance().machine_type);
    tracing::info!("  Version: {}", client.instance().version_string());
    tracing::info!("  Latency: {:.2?}", client.latency());

    match cli.command.unwrap_or(Commands::Listen) {
        Commands::Listen => listen(client).await?,
        Commands::Ping { count } => {
            for seq in 1..=count {
                let latency = client.ping().await?;
                tracing::info!("seq={} time={:.2?}", seq, latency);
            }
            client.close().await;
        }
        Commands::Control { kind, value } => {
            let control = parse_control(kind, value.as_deref())?;
            client.send_control(control).await?;
            tracing::info!("Sent {:?}", control);
            client.close().await;
        }
    }

    Ok(())
}

async fn listen(client: Arc<Client>) -> Result<(), ClientError> {
    let shutdown_client = client.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, closing connection...");
        shutdown_client.close().await;
    });

    let mut handler = ServiceHandler(TelemetryLogger::new());
    let result = client.listen(&mut handler).await;
    tracing::info!("Logged {} messages", handler.into_inner().received());

    match result {
        Err(ClientError::Receive(ReceiveError::ConnectionClosed)) => {
            tracing::info!("Connection closed");
            Ok(())
        }
        other => other,
    }
}
