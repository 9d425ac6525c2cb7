//! # QRLogix Server
//!
//! Entry point for the check-in system.
//!
//! ## Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load the gateway configuration from the environment
//! 3. Initialize logging
//! 4. Open the SQLite database and create the schema if missing
//! 5. Serve HTTP until Ctrl+C
//!
//! ## Subcommands
//!
//! - `serve` - run the HTTP server (default)
//! - `init-db` - create the schema and exit
//! - `authorize-plate <PLACA>` - add a plate to the whitelist
//! - `checkpoint-urls <BASE_URL>` - print the URL to encode in each checkpoint QR

use std::env;
use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use qrlogix_gateway::{GatewayConfig, GatewayService};
use qrlogix_telemetry::{init_logging, TelemetryConfig};
use qrlogix_tracking::{
    normalize_plate, CheckinService, Checkpoint, SqliteConfig, SqliteRepository,
    SystemTimeSource,
};

const DEFAULT_DATABASE_URL: &str = "sqlite:qrlogix.db?mode=rwc";

/// QRLogix: truck check-in by QR code
#[derive(Parser, Debug)]
#[command(name = "qrlogix", version)]
#[command(about = "Truck check-in tracking over QR checkpoints")]
struct Cli {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL, global = true)]
    database_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides QRLOGIX_HOST)
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port (overrides QRLOGIX_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the database schema and exit
    InitDb,

    /// Add a plate to the authorized list
    AuthorizePlate {
        /// License plate
        placa: String,
    },

    /// Print the URL to encode in each checkpoint QR code
    CheckpointUrls {
        /// Public base URL of the server, e.g. https://qr.planta.example
        base_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    });

    let mut config = GatewayConfig::from_env().context("Invalid configuration")?;
    init_telemetry(&config)?;

    match command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.http.host = host;
            }
            if let Some(port) = port {
                config.http.port = port;
            }
            serve(config, &cli.database_url).await
        }
        Command::InitDb => {
            open_repository(&cli.database_url).await?;
            info!(database = %cli.database_url, "Database ready");
            Ok(())
        }
        Command::AuthorizePlate { placa } => {
            let checkin = checkin_service(&config, &cli.database_url).await?;
            let added = checkin
                .authorize_plate(&placa)
                .await
                .with_context(|| format!("Failed to authorize plate {placa:?}"))?;
            let plate = normalize_plate(&placa).unwrap_or_default();
            if added {
                println!("Placa autorizada: {plate}");
            } else {
                println!("La placa ya estaba autorizada: {plate}");
            }
            Ok(())
        }
        Command::CheckpointUrls { base_url } => {
            for (checkpoint, url) in checkpoint_urls(&base_url) {
                println!("{}\t{}\t{}", checkpoint.code(), checkpoint.display_name(), url);
            }
            Ok(())
        }
    }
}

fn init_telemetry(config: &GatewayConfig) -> Result<()> {
    let mut telemetry = TelemetryConfig::from_env();
    let level_set = env::var("QRLOGIX_LOG_LEVEL").is_ok() || env::var("RUST_LOG").is_ok();
    if config.app.debug && !level_set {
        telemetry = telemetry.with_log_level("debug");
    }
    init_logging(&telemetry).context("Failed to initialize logging")
}

async fn open_repository(database_url: &str) -> Result<Arc<SqliteRepository>> {
    let repo = SqliteRepository::connect(&SqliteConfig::from_url(database_url))
        .await
        .with_context(|| format!("Failed to open database {database_url}"))?;
    repo.migrate().await.context("Failed to create schema")?;
    Ok(Arc::new(repo))
}

async fn checkin_service(config: &GatewayConfig, database_url: &str) -> Result<Arc<CheckinService>> {
    let repo = open_repository(database_url).await?;
    Ok(Arc::new(CheckinService::new(
        repo,
        Arc::new(SystemTimeSource),
        config.tracking(),
    )))
}

async fn serve(config: GatewayConfig, database_url: &str) -> Result<()> {
    let checkin = checkin_service(&config, database_url).await?;
    let gateway = GatewayService::new(config, checkin).context("Failed to create gateway")?;

    info!(
        name = %gateway.config().app.name,
        version = qrlogix_gateway::VERSION,
        "QRLogix starting. Press Ctrl+C to stop."
    );

    gateway
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")
}

fn checkpoint_urls(base_url: &str) -> Vec<(Checkpoint, String)> {
    let base = base_url.trim_end_matches('/');
    Checkpoint::ALL
        .into_iter()
        .map(|checkpoint| (checkpoint, format!("{base}/scan/{}", checkpoint.code())))
        .collect()
}
