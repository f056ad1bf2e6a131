pub mod csv_feed;
pub mod source;

pub use csv_feed::CsvFeed;
pub use source::FeedSource;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::models::GameResult;
use crate::reconcile::{IngestSummary, Reconciler};

/// Failures specific to downloading or reading the results feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to read feed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("feed is missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("malformed feed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// One parsed line of the results feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRow {
    /// Day key with the weekday prefix removed, e.g. "Jan 5"
    pub date: String,
    pub visitor: String,
    pub visitor_score: i64,
    pub home: String,
    pub home_score: i64,
}

impl From<FeedRow> for GameResult {
    fn from(row: FeedRow) -> Self {
        GameResult {
            date: row.date,
            team1: row.visitor,
            team1_score: row.visitor_score,
            team2: row.home,
            team2_score: row.home_score,
        }
    }
}

/// Fetch the feed once and reconcile every row into the store.
pub async fn import(source: &dyn FeedSource, reconciler: &Reconciler) -> anyhow::Result<IngestSummary> {
    let rows = source.fetch_rows().await?;
    info!("{} returned {} rows", source.name(), rows.len());

    let reconciler = reconciler.clone();
    tokio::task::spawn_blocking(move || reconciler.ingest(rows.into_iter().map(GameResult::from)))
        .await?
}

/// Re-import the feed on a fixed interval until the task is dropped.
pub fn start_refresh(
    source: Arc<dyn FeedSource>,
    reconciler: Reconciler,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match import(source.as_ref(), &reconciler).await {
                Ok(summary) if summary.total() == 0 => {
                    warn!("{} refresh produced no rows", source.name())
                }
                Ok(_) => {}
                Err(e) => error!("{} refresh failed: {:#}", source.name(), e),
            }
        }
    })
}
