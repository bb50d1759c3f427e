//! EODHD market data provider implementation.
//!
//! This module fetches data from the EODHD REST API:
//! - Daily bars via the `/eod/{SYMBOL}.{EXCHANGE}` endpoint
//! - 1-minute bars via `/intraday/{SYMBOL}.{EXCHANGE}?interval=1m`
//! - Listing dates via `/fundamentals/{SYMBOL}.{EXCHANGE}?filter=General::IPODate`
//!
//! Note: EODHD meters intraday and fundamentals requests more heavily than
//! EOD requests; the client keeps a running count of consumed API calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::fetcher::MarketDataFetcher;
use crate::models::{Fundamentals, RawBars};

const DEFAULT_BASE_URL: &str = "https://eodhd.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// API calls consumed per request, per the provider's metering rules.
const EOD_CALLS_PER_REQUEST: u64 = 1;
const INTRA_CALLS_PER_REQUEST: u64 = 5;
const FUNDAMENTALS_CALLS_PER_REQUEST: u64 = 10;

/// EODHD market data client.
///
/// One instance is shared across the whole run; the underlying
/// `reqwest::Client` handles connection pooling.
pub struct EodhdClient {
    client: Client,
    base_url: String,
    api_token: String,
    calls_used: AtomicU64,
}

impl EodhdClient {
    /// Creates a client against the production EODHD endpoint.
    pub fn new(api_token: impl Into<String>) -> Result<Self, MarketDataError> {
        Self::with_base_url(api_token, DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL (test servers).
    pub fn with_base_url(
        api_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, MarketDataError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            calls_used: AtomicU64::new(0),
        })
    }

    /// API calls consumed so far by this client instance.
    pub fn calls_used(&self) -> u64 {
        self.calls_used.load(Ordering::Relaxed)
    }

    /// Performs a GET against `path`, mapping HTTP failures onto the error
    /// taxonomy and decoding the body as JSON.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, MarketDataError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("api_token", self.api_token.as_str()), ("fmt", "json")])
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(MarketDataError::Unauthorized {
                    endpoint: path.to_string(),
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(MarketDataError::RateLimited {
                    endpoint: path.to_string(),
                })
            }
            s => {
                return Err(MarketDataError::Status {
                    status: s.as_u16(),
                    endpoint: path.to_string(),
                })
            }
        }

        response.json::<Value>().await.map_err(|e| MarketDataError::Parse {
            message: e.to_string(),
        })
    }

    /// Decodes a bar-array payload, treating an empty array as an error.
    fn decode_bars(path: &str, value: Value) -> Result<RawBars, MarketDataError> {
        let bars = match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(MarketDataError::Parse {
                        message: format!("expected bar object, got {}", other),
                    }),
                })
                .collect::<Result<RawBars, _>>()?,
            other => {
                return Err(MarketDataError::Parse {
                    message: format!("expected bar array, got {}", other),
                })
            }
        };

        if bars.is_empty() {
            return Err(MarketDataError::EmptyResponse {
                endpoint: path.to_string(),
            });
        }
        Ok(bars)
    }
}

#[async_trait]
impl MarketDataFetcher for EodhdClient {
    async fn request_eod(
        &self,
        symbol: &str,
        exchange: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawBars, MarketDataError> {
        info!("fetching eod data for {}.{} between {} and {}", symbol, exchange, start, end);
        self.calls_used.fetch_add(EOD_CALLS_PER_REQUEST, Ordering::Relaxed);

        let path = format!("/eod/{}.{}", symbol, exchange);
        let query = [
            ("period", "d".to_string()),
            ("order", "a".to_string()),
            ("from", start.format("%Y-%m-%d").to_string()),
            ("to", end.format("%Y-%m-%d").to_string()),
        ];
        let value = self.get_json(&path, &query).await?;
        let bars = Self::decode_bars(&path, value)?;
        info!("- {} data points returned", bars.len());
        Ok(bars)
    }

    async fn request_intra(
        &self,
        symbol: &str,
        exchange: &str,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<RawBars, MarketDataError> {
        info!("fetching intra data for {}.{} between {} and {}", symbol, exchange, start_ts, end_ts);
        self.calls_used.fetch_add(INTRA_CALLS_PER_REQUEST, Ordering::Relaxed);

        let path = format!("/intraday/{}.{}", symbol, exchange);
        let query = [
            ("interval", "1m".to_string()),
            ("from", start_ts.to_string()),
            ("to", end_ts.to_string()),
        ];
        let value = self.get_json(&path, &query).await?;
        let bars = Self::decode_bars(&path, value)?;
        info!("- {} data points returned", bars.len());
        Ok(bars)
    }

    async fn request_fundamentals(
        &self,
        symbol: &str,
        exchange: &str,
    ) -> Result<Fundamentals, MarketDataError> {
        debug!("fetching ipo date for {}.{}", symbol, exchange);
        self.calls_used.fetch_add(FUNDAMENTALS_CALLS_PER_REQUEST, Ordering::Relaxed);

        let path = format!("/fundamentals/{}.{}", symbol, exchange);
        let query = [("filter", "General::IPODate".to_string())];
        let value = self.get_json(&path, &query).await?;
        Ok(Fundamentals::from_ipo_value(&value))
    }
}
