//! HTTP server command implementation.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use babylon::background::BackgroundTasks;
use babylon::config::Config;
use babylon::server::{self, HubServices, SelfManagement};
use babylon::session::{SweeperConfig, spawn_sweeper};
use babylon::transport::HttpTransport;

pub async fn run(
    config_path: &str,
    host_override: Option<IpAddr>,
    port_override: Option<u16>,
) -> Result<()> {
    let mut config = Config::load(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    // CLI overrides config
    if let Some(host) = host_override {
        config.server.host = host.to_string();
    }
    if let Some(port) = port_override {
        config.server.port = port;
    }

    let transport = HttpTransport::new(config.server.outbound_timeout())
        .context("Failed to build outbound HTTP client")?;

    let background_tasks = BackgroundTasks::new();
    let services = HubServices::new(Arc::new(transport), background_tasks.clone());

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        services.sessions.clone(),
        SweeperConfig::from(&config.sessions),
        shutdown.child_token(),
    );

    server::spawn_preconfigured_peers(&services, &config, &background_tasks);

    let state = server::AppState {
        services,
        self_management: SelfManagement::from(&config.security),
        max_connections: config.server.max_connections,
    };

    let app = server::build_app(state, config.server.request_timeout_seconds);

    let ip: IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid host '{}'", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        addr = %addr,
        callback = %config.server.server_callback(),
        "Starting server"
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Stop evicting, then let in-flight notifications reach their peers
    shutdown.cancel();
    sweeper.shutdown().await;
    background_tasks.shutdown().await;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
