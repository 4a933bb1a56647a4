/*!
SSH_EXPORTER - process entry point

ROLE : parses flags, checks the configuration once (an unreadable file is
fatal here, nowhere else), wires the SSH runner into the dispatcher and
serves the router until SIGINT/SIGTERM.

ARCHITECTURE : cli -> SshRunner -> BatchDispatcher -> axum router (http.rs),
self telemetry registry shared through the application state.
*/

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ssh_exporter::{build_router, AppState, Cli, Telemetry};
use ssh_exporter_core::{BatchDispatcher, Config, SshRunner};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ssh_exporter=info,ssh_exporter_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .await
        .with_context(|| format!("cannot start without {}", cli.config.display()))?;
    tracing::info!(
        path = %cli.config.display(),
        scripts = config.scripts.len(),
        "configuration loaded"
    );

    let runner = SshRunner::new(cli.ssh_options());
    let dispatcher = BatchDispatcher::new(Arc::new(runner), cli.dispatch_options());
    let telemetry = Telemetry::new().context("failed to register telemetry")?;

    let app_state = AppState {
        config_path: Arc::new(cli.config.clone()),
        dispatcher: Arc::new(dispatcher),
        telemetry,
    };
    let app = build_router(app_state);

    let addr = SocketAddr::new(cli.bind, cli.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, max_concurrency = cli.max_concurrency, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
