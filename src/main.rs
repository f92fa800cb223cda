use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use flight_delay_web::{assets::Assets, config::Config, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::from_env()?;
    let assets = Assets::load(&cfg)?;
    // Warmup so a broken model fails here, not on the first request
    assets.warmup()?;
    tracing::info!("warmup forward ok");

    let state = server::AppState::new(Arc::new(assets), cfg.log_pred);
    let app = server::router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
