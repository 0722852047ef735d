use anyhow::{Context, Result};
use clap::Parser;
use klatt_api::{AppState, Args, Config, router};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = Config::from_args(&args).context("Failed to load configuration")?;
    info!(
        auth = config.auth_enabled(),
        sample_rate = config.sample_rate,
        glottal_source = ?config.glottal_source,
        cors_origin = %config.cors_origin,
        "configuration loaded"
    );

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, router(AppState::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl+C: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
