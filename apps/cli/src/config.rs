//! Environment-driven runtime configuration.

use anyhow::Context;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file holding the per-ticker price tables.
    pub db_path: String,
    /// SQLite file holding the no-data ledger.
    pub nodata_db_path: String,
    /// EODHD API token.
    pub api_token: String,
    /// Override for the provider base URL.
    pub api_base: Option<String>,
    /// Newline-separated ticker universe, used when no tickers are passed
    /// on the command line.
    pub ticker_file: Option<String>,
    /// Where to persist the failed-ticker list for a retry run.
    pub error_file: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            db_path: std::env::var("GAPSYNC_DB_PATH")
                .unwrap_or_else(|_| "gapsync.db".to_string()),
            nodata_db_path: std::env::var("GAPSYNC_NODATA_DB_PATH")
                .unwrap_or_else(|_| "gapsync_nodata.db".to_string()),
            api_token: std::env::var("GAPSYNC_API_TOKEN")
                .context("GAPSYNC_API_TOKEN is not set")?,
            api_base: std::env::var("GAPSYNC_API_BASE").ok(),
            ticker_file: std::env::var("GAPSYNC_TICKER_FILE").ok(),
            error_file: std::env::var("GAPSYNC_ERROR_FILE").ok(),
        })
    }
}
