mod config;
mod credentials;
mod gemini;
mod models;
mod presenter;
mod prompt;
mod routes;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{config::Config, gemini::GeminiClient, routes::AppState, session::SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    match config.gemini_api_key.as_deref().and_then(credentials::Credential::new) {
        Some(key) => tracing::info!("🔐 API key is securely loaded: {:?}", key),
        None => tracing::info!("🔑 No GEMINI_API_KEY set, users must enter their own key"),
    }

    let state = AppState {
        sessions: SessionStore::default(),
        generator: Arc::new(GeminiClient::new(config.gemini_api_base.clone(), config.gemini_model.clone())),
        stored_key: config.gemini_api_key.as_deref().map(Arc::from),
    };

    let sessions = state.sessions.clone();
    let max_idle = config.session_idle;
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            tick.tick().await;
            let swept = sessions.sweep_idle(max_idle);
            if swept > 0 {
                tracing::info!("🧹 Cleared {} idle sessions", swept);
            }
        }
    });

    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, model = %config.gemini_model, "Starting Lazy Lister");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")?;
    Ok(())
}
