use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod assets;
mod config;
mod inference;
mod mail;
mod state;

use config::AppConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // -----------------------------
    // Configuration / shared state
    // -----------------------------
    let config = AppConfig::from_env().context("invalid configuration")?;
    info!(
        bind = %config.bind_addr,
        inference_host = %config.inference.host,
        general_model = %config.inference.general_model,
        code_model = %config.inference.code_model,
        smtp = ?config.smtp,
        origins = ?config.allowed_origins,
        frontend = %config.frontend_dist.display(),
        "configuration loaded"
    );

    let addr = config.bind_addr;
    let state = AppState::new(config)?;
    let app = api::app(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("HTTP listening on http://{addr}");
    info!("Chat proxy at http://{addr}/chat, claim form at http://{addr}/submit");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
