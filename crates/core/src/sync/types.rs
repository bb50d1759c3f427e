//! Result types for sync runs.

use crate::types::Ticker;

/// Result of a sync operation for a single ticker.
#[derive(Debug, Clone)]
pub struct TickerSyncResult {
    /// The ticker that was processed.
    pub ticker: Ticker,
    /// Number of EOD rows written.
    pub eod_rows: usize,
    /// Number of intraday rows written.
    pub intra_rows: usize,
    /// Number of residual slots recorded as confirmed-absent.
    pub nodata_recorded: usize,
    /// The status after the operation.
    pub status: SyncStatus,
}

/// Status of a per-ticker sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// The ticker finished the state machine (including no-op syncs).
    Completed,
    /// The ticker was skipped without any writes.
    Skipped(SkipReason),
    /// The ticker errored; processing moved on to the next one.
    Failed(String),
}

/// Reason why a ticker was skipped during sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The listing date falls after the requested range.
    ListedAfterRange,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ListedAfterRange => write!(f, "Listed after the requested range"),
        }
    }
}

/// Aggregate result of a sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Number of tickers that completed.
    pub completed: usize,
    /// Number of tickers skipped without writes.
    pub skipped: usize,
    /// Number of tickers that errored.
    pub failed: usize,
    /// Total rows written across both series.
    pub rows_written: usize,
    /// (ticker, reason) for each failed ticker, in processing order.
    pub failures: Vec<(String, String)>,
    /// (ticker, reason) for each skipped ticker.
    pub skipped_reasons: Vec<(String, SkipReason)>,
}

impl SyncReport {
    /// True when no ticker errored.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Tickers to feed back into the next run.
    pub fn failed_tickers(&self) -> Vec<&str> {
        self.failures.iter().map(|(t, _)| t.as_str()).collect()
    }

    pub(crate) fn add(&mut self, result: TickerSyncResult) {
        match result.status {
            SyncStatus::Completed => {
                self.completed += 1;
                self.rows_written += result.eod_rows + result.intra_rows;
            }
            SyncStatus::Skipped(reason) => {
                self.skipped += 1;
                self.skipped_reasons
                    .push((result.ticker.to_string(), reason));
            }
            SyncStatus::Failed(message) => {
                self.failed += 1;
                self.failures.push((result.ticker.to_string(), message));
            }
        }
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Complete {} tickers update, {} fail to update.",
            self.completed + self.skipped,
            self.failed
        )
    }
}
