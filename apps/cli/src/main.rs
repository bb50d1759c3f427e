//! `gapsync <START> <END> [TICKER...]`
//!
//! Synchronizes end-of-day and 1-minute price history for the given tickers
//! over an inclusive date range, then prints the run summary. When no
//! tickers are passed, the universe is read from `GAPSYNC_TICKER_FILE`.

mod config;

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use config::Config;
use gapsync_core::calendar::TradingCalendar;
use gapsync_core::sync::{SyncParams, SyncService};
use gapsync_core::Ticker;
use gapsync_market_data::EodhdClient;
use gapsync_storage_sqlite::{create_pool, SqliteNoDataRepository, SqlitePriceRepository};

fn init_tracing() {
    let log_format = std::env::var("GAPSYNC_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

fn parse_date(arg: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(arg, "%Y-%m-%d")
        .with_context(|| format!("'{}' is not a YYYY-MM-DD date", arg))
}

/// Parses a newline-separated ticker universe. Blank lines and `#` comments
/// are skipped.
fn parse_universe(contents: &str) -> anyhow::Result<Vec<Ticker>> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| Ticker::parse(line).map_err(anyhow::Error::from))
        .collect()
}

fn resolve_tickers(args: &[String], config: &Config) -> anyhow::Result<Vec<Ticker>> {
    if !args.is_empty() {
        return args
            .iter()
            .map(|s| Ticker::parse(s).map_err(anyhow::Error::from))
            .collect();
    }
    let Some(path) = &config.ticker_file else {
        bail!("no tickers on the command line and GAPSYNC_TICKER_FILE is not set");
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ticker file '{}'", path))?;
    let tickers = parse_universe(&contents)?;
    if tickers.is_empty() {
        bail!("ticker file '{}' contains no tickers", path);
    }
    Ok(tickers)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: gapsync <START> <END> [TICKER...]");
        std::process::exit(2);
    }

    let start = parse_date(&args[0])?;
    let end = parse_date(&args[1])?;
    if start > end {
        bail!("start date {} is after end date {}", start, end);
    }

    let config = Config::from_env()?;
    let tickers = resolve_tickers(&args[2..], &config)?;

    let price_pool = create_pool(&config.db_path)?;
    let nodata_pool = create_pool(&config.nodata_db_path)?;
    let ledger = Arc::new(SqliteNoDataRepository::new(nodata_pool));
    let prices = Arc::new(SqlitePriceRepository::new(price_pool, ledger.clone()));

    let fetcher = Arc::new(
        match &config.api_base {
            Some(base) => EodhdClient::with_base_url(&config.api_token, base),
            None => EodhdClient::new(&config.api_token),
        }
        .context("failed to build the provider client")?,
    );

    let service = SyncService::new(
        prices,
        ledger,
        fetcher.clone(),
        TradingCalendar::us_equity(),
    );
    let params = SyncParams::new(start, end, tickers);

    // Per-ticker failures land in the report; only a run-level failure
    // propagates here and flips the exit code.
    let report = service.run(&params).await?;

    println!("{}", report);
    tracing::info!("provider api calls used: {}", fetcher.calls_used());

    if !report.failures.is_empty() {
        if let Some(path) = &config.error_file {
            let mut contents = report.failed_tickers().join("\n");
            contents.push('\n');
            std::fs::write(path, contents)
                .with_context(|| format!("failed to write error file '{}'", path))?;
            tracing::info!(
                "saved {} failed tickers to {}",
                report.failures.len(),
                path
            );
        }
    }

    Ok(())
}
