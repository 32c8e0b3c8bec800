use clap::Parser;
use colored::*;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

use dialogue_engine::spawn_purge_task;
use error_common::{MediConnectError, Result};
use mediconnect_server::{create_app, MediConnectServer};

/// MediConnect telephone booking server
#[derive(Parser, Debug)]
#[command(name = "mediconnect-server")]
#[command(about = "Telephony webhook handler and admin API for clinic appointment booking")]
struct Args {
    /// Server bind address, overrides server.host
    #[arg(long, env = "MEDICONNECT_HOST")]
    host: Option<String>,

    /// Server port, overrides server.port
    #[arg(short, long, env = "MEDICONNECT_PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "mediconnect.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Insert the demo hospital and doctors when the store is empty
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal outside development
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let mut config = config_engine::load(Some(&args.config))
        .map_err(|e| MediConnectError::ConfigError(e.to_string()))?;
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let _log_guard = logger_redacted::init_tracing(&config.logging, args.verbose)
        .map_err(|e| MediConnectError::ConfigError(e.to_string()))?;
    if atty::is(atty::Stream::Stdout) {
        print_startup_banner();
    }

    info!("🏥 {}", "Starting MediConnect server".bright_cyan());
    info!("📋 Version: {}", env!("CARGO_PKG_VERSION").bright_white());
    info!(
        "🌐 Bind address: {}",
        format!("{}:{}", config.server.host, config.server.port).bright_yellow()
    );
    info!("📞 Callback base URL: {}", config.server.public_base_url.bright_yellow());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| MediConnectError::ConfigError(format!("invalid bind address: {e}")))?;
    let session_ttl = Duration::from_secs(config.dialogue.session_ttl_secs);
    let purge_every = Duration::from_secs(config.dialogue.purge_interval_secs);

    let server = MediConnectServer::from_config(config).await?;

    if args.seed_demo {
        seed_demo(&server).await?;
    }

    let purge = spawn_purge_task(server.sessions.clone(), session_ttl, purge_every);
    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MediConnectError::NetworkError(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("🚀 {}", format!("MediConnect running on http://{}", addr).bright_green());
    info!("📋 {}", format!("Health check: http://{}/api/health", addr).bright_blue());
    info!("☎️  {}", format!("Voice webhooks: http://{}/api/voice/incoming", addr).bright_blue());
    info!("📖 {}", format!("OpenAPI: http://{}/api/openapi.json", addr).bright_blue());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MediConnectError::ServerError(format!("HTTP server error: {}", e)))?;

    purge.abort();
    info!("👋 {}", "MediConnect stopped".bright_cyan());
    Ok(())
}

async fn seed_demo(server: &MediConnectServer) -> Result<()> {
    let existing = server
        .repository
        .list_hospitals(false)
        .await
        .map_err(|e| MediConnectError::DatabaseError(e.to_string()))?;
    if !existing.is_empty() {
        warn!(hospitals = existing.len(), "Store already has hospitals, skipping demo seed");
        return Ok(());
    }

    let tenant = schedule_store::demo::seed(server.repository.as_ref())
        .await
        .map_err(|e| MediConnectError::DatabaseError(e.to_string()))?;
    info!(
        "🌱 {}",
        format!(
            "Demo hospital '{}' on {} with {} doctors",
            tenant.hospital.name,
            schedule_store::demo::DEMO_INBOUND_NUMBER,
            tenant.doctors.len()
        )
        .bright_green()
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining requests");
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                      🏥 MEDICONNECT                          ║".bright_cyan());
    println!("{}", "║            Telephone appointment booking for clinics         ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}
