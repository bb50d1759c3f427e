//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all provider operations
//! - [`RetryClass`]: Classification for determining retry behavior

use thiserror::Error;

/// Errors that can occur while talking to the market-data provider.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which the sync engine uses to
/// decide whether a failed ticker is worth re-queuing for the next run.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// A network error occurred while communicating with the provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider rejected the API token (HTTP 401/403).
    /// Retrying with the same credentials won't help.
    #[error("Unauthorized by provider at {endpoint}")]
    Unauthorized {
        /// The endpoint that rejected the request
        endpoint: String,
    },

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited at {endpoint}")]
    RateLimited {
        /// The endpoint that rate limited the request
        endpoint: String,
    },

    /// The provider returned an unexpected HTTP status.
    #[error("Provider returned status {status} at {endpoint}")]
    Status {
        /// The HTTP status code
        status: u16,
        /// The endpoint that returned the status
        endpoint: String,
    },

    /// A successful response carried an empty payload.
    ///
    /// The provider cannot distinguish "no data exists" from "request was
    /// not served"; the sync engine owns that distinction, so an empty body
    /// is surfaced as an error here.
    #[error("Empty response from {endpoint}")]
    EmptyResponse {
        /// The endpoint that returned the empty payload
        endpoint: String,
    },

    /// The response body could not be decoded as the expected JSON shape.
    #[error("Failed to parse provider response: {message}")]
    Parse {
        /// Description of the decode failure
        message: String,
    },
}

/// Classification for retry policy.
///
/// The sync engine processes tickers sequentially and never retries within a
/// run; the class only decides whether a failed ticker belongs in the
/// saved error list for the next run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Worth retrying on a later run: the failure is plausibly transient
    /// (network, rate limit, provider-side error, empty body).
    Transient,

    /// Retrying won't help: bad credentials or a malformed response shape.
    Permanent,
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use gapsync_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { endpoint: "/eod".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Transient);
    ///
    /// let error = MarketDataError::Unauthorized { endpoint: "/eod".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Permanent);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Network(_) | Self::RateLimited { .. } | Self::EmptyResponse { .. } => {
                RetryClass::Transient
            }

            // 5xx is the provider's problem, 4xx is ours
            Self::Status { status, .. } if *status >= 500 => RetryClass::Transient,
            Self::Status { .. } => RetryClass::Permanent,

            Self::Unauthorized { .. } | Self::Parse { .. } => RetryClass::Permanent,
        }
    }
}
