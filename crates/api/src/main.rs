//! FleetCare API server binary.
//!
//! Usage:
//!   fleetcare-api --config fleetcare.toml
//!   fleetcare-api --port 8080
//!   fleetcare-api --port 8080 --bind 0.0.0.0 --report ./crew_report.json
//!
//! # Environment Variables
//!
//! - `FLEETCARE_BIND_ADDR` - Server bind address (default: 127.0.0.1)
//! - `FLEETCARE_REPORT_PATH` - Crew report served by the dashboard
//! - `FLEETCARE_ROUTE_PROXY_URL` - Upstream route service base URL
//! - `FLEETCARE_ROUTE_API_KEY` - Bearer key for the route service

use fleetcare_api::{serve, ApiConfig, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetcare_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut port: Option<u16> = None;
    let mut config_path: Option<String> = None;
    let mut bind_addr: Option<String> = None;
    let mut report_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    port = Some(
                        args[i + 1]
                            .parse()
                            .map_err(|_| anyhow::anyhow!("Invalid port number: {}", args[i + 1]))?,
                    );
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    bind_addr = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--report" | "-r" => {
                if i + 1 < args.len() {
                    report_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("FleetCare API Server");
                println!();
                println!("Usage: fleetcare-api [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --port <PORT>        Port to listen on (default: 5000)");
                println!(
                    "  -b, --bind <ADDR>        Bind address (default: 127.0.0.1, env: FLEETCARE_BIND_ADDR)"
                );
                println!("  -c, --config <FILE>      Path to a TOML config file");
                println!(
                    "  -r, --report <FILE>      Crew report JSON (default: crew_report.json, env: FLEETCARE_REPORT_PATH)"
                );
                println!("  -h, --help               Show this help message");
                println!();
                println!("Environment variables:");
                println!("  FLEETCARE_BIND_ADDR        Server bind address (overridden by --bind)");
                println!("  FLEETCARE_REPORT_PATH      Crew report path (overridden by --report)");
                println!("  FLEETCARE_ROUTE_PROXY_URL  Upstream route service base URL");
                println!("  FLEETCARE_ROUTE_API_KEY    Bearer key for the route service");
                return Ok(());
            }
            other => {
                tracing::warn!(arg = %other, "Ignoring unrecognized argument");
            }
        }
        i += 1;
    }

    // Precedence: CLI flag > env var > config file > default
    let mut config = if let Some(path) = config_path {
        tracing::info!(path = %path, "Loading configuration");
        ApiConfig::from_file(&path)?
    } else {
        tracing::info!("Using default configuration");
        ApiConfig::default()
    };
    config.apply_env();
    if let Some(addr) = bind_addr {
        config.bind_addr = addr;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(path) = report_path {
        config.report_path = path;
    }

    if config.bind_addr == "0.0.0.0" {
        tracing::warn!(
            "Server binding to 0.0.0.0 exposes the API to all network interfaces. \
             The API has no authentication; make sure a firewall is in place."
        );
    }

    tracing::info!(
        report_path = %config.report_path.display(),
        route_proxy = config.route_proxy.is_some(),
        "Configuration resolved"
    );

    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port).parse()?;
    let state = AppState::new(config);
    serve(Arc::new(state), addr).await?;

    Ok(())
}
