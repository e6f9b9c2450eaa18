use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing::{error, info, warn};

use fulfillment_server::{create_app, FulfillmentServer, ServerConfig, StorageMode};
use logger_redacted::{init_tracing, LoggerConfig};

/// Prescription fulfillment HTTP server
#[derive(Parser, Debug)]
#[command(name = "fulfillment-server")]
#[command(about = "Prescription submission and pharmacy fulfillment HTTP API server")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "8080", env = "PORT")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Storage backend, overrides FULFILLMENT_STORAGE
    #[arg(long, value_parser = parse_storage)]
    storage: Option<StorageMode>,
}

fn parse_storage(value: &str) -> Result<StorageMode, String> {
    value.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside development
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let logger = LoggerConfig::from_env(args.verbose);
    init_tracing(&logger)?;
    if logger.format == logger_redacted::LogFormat::Pretty {
        print_startup_banner();
    }

    let mut config = ServerConfig::from_env()?;
    if let Some(storage) = args.storage {
        config = config.with_storage(storage);
    }

    info!("{}", "Starting fulfillment server".bright_cyan());
    info!("Version: {}", env!("CARGO_PKG_VERSION").bright_white());
    info!("Storage: {}", config.storage.to_string().bright_yellow());
    info!("Pharmacy API: {}", config.pharmacy_api_base_url.bright_yellow());
    if config.webhook_secret().is_none() {
        warn!("Status webhook accepts unauthenticated callbacks (WEBHOOK_SHARED_SECRET unset)");
    }

    let server = FulfillmentServer::new(config).await?;
    let app = create_app(server);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!("{}", format!("Fulfillment server running on http://{addr}").bright_green());
    info!("{}", format!("Health check available at: http://{addr}/health").bright_blue());
    info!("{}", format!("API v1 available at: http://{addr}/api/v1").bright_blue());

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "HTTP server error");
        return Err(e.into());
    }

    info!("Fulfillment server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                    PRESCRIPTION FULFILLMENT                  ║".bright_cyan());
    println!("{}", "║           Submission, Discount Tiers, Pharmacy Status        ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}
