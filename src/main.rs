//! Catalog & Cart Service - supplier feeds, carts and orders

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_cart::{
    feed::HttpFeedSource,
    mail::LogMailer,
    router,
    store::PgStore,
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load().context("loading configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log.level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    anyhow::ensure!(!config.database.url.is_empty(), "DATABASE_URL is not set");
    let store = PgStore::connect(&config.database).await.context("connecting to database")?;
    let feeds = HttpFeedSource::new(&config.feed).context("building feed client")?;
    let state = AppState::new(Arc::new(store), Arc::new(feeds), Arc::new(LogMailer), config.mail.clone());

    let addr = config.bind_addr();
    tracing::info!("🚀 Catalog & Cart service listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, router(state)).await?;
    Ok(())
}
