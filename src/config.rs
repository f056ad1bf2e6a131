use clap::Parser;
use std::net::SocketAddr;

/// Game results server for settling bets
#[derive(Parser, Debug, Clone)]
#[command(name = "game-results-server", version, about)]
pub struct Config {
    /// HTTP listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:5000")]
    pub listen_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "games_database.db")]
    pub database_path: String,

    /// Published CSV of historical game results
    #[arg(
        long,
        env = "FEED_URL",
        default_value = "https://docs.google.com/spreadsheets/d/e/2PACX-1vSOiUF09fWkEaXBNNC1XhYzXC9FhWKb4W1Gs7Wma5bumtrrSCg22wRysRbfwaBygOD2bfR0MQZwXf_C/pub?output=csv"
    )]
    pub feed_url: String,

    /// Background feed refresh interval in seconds (0 disables the refresh task)
    #[arg(long, env = "FEED_REFRESH_SECS", default_value = "0")]
    pub feed_refresh_secs: u64,

    /// Timeout for feed downloads in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "30")]
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("listen_addr '{}' is not a valid socket address", self.listen_addr);
        }
        if self.database_path.trim().is_empty() {
            anyhow::bail!("database_path must not be empty");
        }
        if !(self.feed_url.starts_with("http://") || self.feed_url.starts_with("https://")) {
            anyhow::bail!("feed_url must be an http(s) URL");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be positive");
        }
        Ok(())
    }
}
