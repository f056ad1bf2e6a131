use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod db;
mod feed;
mod reconcile;

use api::AppState;
use config::Config;
use db::Database;
use feed::{CsvFeed, FeedSource};
use reconcile::Reconciler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database; the games table is created here once
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let reconciler = Reconciler::new(db);
    let feed: Arc<dyn FeedSource> = Arc::new(CsvFeed::new(
        &config.feed_url,
        Duration::from_secs(config.http_timeout_secs),
    )?);

    let refresh = if config.feed_refresh_secs > 0 {
        info!(
            "Refreshing results feed every {}s from {}",
            config.feed_refresh_secs, config.feed_url
        );
        Some(feed::start_refresh(
            feed.clone(),
            reconciler.clone(),
            Duration::from_secs(config.feed_refresh_secs),
        ))
    } else {
        info!("Background feed refresh disabled; use /scrape to import results");
        None
    };

    let app = api::router(AppState { reconciler, feed });
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server until Ctrl-C
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    if let Some(handle) = refresh {
        handle.abort();
    }
    info!("Server stopped");
    Ok(())
}
