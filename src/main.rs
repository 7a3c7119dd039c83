mod cli;
mod clients;
mod config;
mod error;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
mod websocket;

use std::panic;
use std::sync::Arc;

use cli::Cli;
use clients::readiness_client::ReadinessClient;
use config::Config;
use error::ServerError;
use routes::create_app_routes;
use services::monitor::StatusMonitor;
use services::status_file::StatusFile;
use state::AppState;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use websocket::hub::Hub;

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    let cli = Cli::parse_args();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "loading_status_server=info,tower_http=info".into()
        }))
        .init();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    let config = match config.apply_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    info!("Starting server...");

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), ServerError> {
    let config = Arc::new(config);
    let status_file = StatusFile::new(&config.status_file);

    if let Err(e) = status_file.ensure_exists().await {
        warn!("Could not initialize status file: {}", e);
    }

    let (hub, hub_handle) = Hub::new(status_file.clone());
    tokio::spawn(hub.run());

    let readiness = match ReadinessClient::from_config(&config) {
        Ok(readiness) => Some(readiness),
        Err(e) => {
            error!("Failed to build readiness client, target will never count as ready: {}", e);
            None
        }
    };
    let mut monitor = StatusMonitor::new(
        status_file.clone(),
        readiness,
        hub_handle.clone(),
        &config,
    );
    // Baseline before the listener accepts anyone
    monitor.prime().await;
    tokio::spawn(monitor.run());

    let app_routes = create_app_routes(AppState {
        config: config.clone(),
        hub: hub_handle,
        status_file,
    });

    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("🚀 Status server running on http://{}", addr);
    info!("📡 WebSocket available at ws://{}/ws", addr);

    axum::serve(listener, app_routes)
        .await
        .map_err(ServerError::Serve)
}
