use std::sync::Arc;

use anyhow::Context;
use canvas_hub::{config::Config, state::Hub, store::CanvasStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("canvas_hub=info,tower_http=info")),
        )
        .init();

    let cfg = Arc::new(Config::from_env()?);
    let store = CanvasStore::open(&cfg.database_url)
        .await
        .with_context(|| format!("opening {}", cfg.database_url))?;
    let hub = Hub::default();

    let app = canvas_hub::app(cfg.clone(), hub, store);

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
