use anyhow::Result;
use async_trait::async_trait;

use super::FeedRow;

/// Trait that every results feed must implement.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Download and parse the full set of published results.
    async fn fetch_rows(&self) -> Result<Vec<FeedRow>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
