//! KnowNet Web Server
//!
//! Run with: cargo run -p knownet-web

use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = knownet_common::KnownetConfig::load()?;

    let kg = match &config.kg.seed_path {
        Some(path) => knownet_kg::KgStore::from_json_file(path)?,
        None => {
            warn!("no KG seed configured; starting with the built-in demo graph");
            knownet_kg::KgStore::demo()
        }
    };

    let llm = match knownet_llm::LlmRouter::from_config(&config.llm) {
        Ok(router) => router,
        Err(e) => {
            warn!("LLM backend not ready ({e}); callers must supply an API key per request");
            knownet_llm::LlmRouter::new(config.llm.provider.clone(), config.llm.clone())
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = knownet_web::state::AppState::new(config, kg, llm);
    let app = knownet_web::router::build_router(state);

    info!("KnowNet listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
