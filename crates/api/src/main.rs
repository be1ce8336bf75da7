use anyhow::Context;
use tracing::{info, warn};

use catalog_api::app::{AppState, build_app};
use catalog_infra::{AppConfig, build_store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.uses_dev_secret() {
        warn!("JWT_SECRET not set; using insecure dev default");
    }
    info!(?config, "configuration loaded");

    let store = build_store(config.database.as_ref())
        .await
        .context("failed to initialise storage")?;
    let app = build_app(AppState::new(store, &config));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
