//! Trading calendar: reference sessions and the intraday minute grid.
//!
//! Holiday/weekend rules live behind the [`SessionSource`] trait so they can
//! be swapped without touching the engine; [`UsEquitySessions`] is the
//! shipped oracle for the US equity venues. [`TradingCalendar`] turns
//! sessions into the canonical per-minute timestamp grid in exchange-local
//! time.

mod us_equity;

pub use us_equity::UsEquitySessions;

use chrono::{Duration, NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::errors::{Error, Result};

/// Grid window: 04:00 (inclusive) to 20:00 (exclusive), exchange-local.
/// Covers pre-market through the end of post-market for US equities.
const GRID_OPEN_HOUR: u32 = 4;
const GRID_CLOSE_HOUR: u32 = 20;

/// One grid point per minute.
const GRID_STEP_SECS: i64 = 60;

/// Exchange timezone for the US venues.
pub const US_EXCHANGE_TZ: Tz = chrono_tz::America::New_York;

/// Produces the ordered set of open-market dates for a range.
///
/// Deterministic for fixed calendar data; `start > end` yields an empty
/// sequence, not an error.
pub trait SessionSource: Send + Sync {
    fn sessions(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>>;
}

/// Reference calendar: sessions plus the deterministic intraday grid.
///
/// The grid is regenerated from session dates on every use, never stored.
pub struct TradingCalendar {
    source: Box<dyn SessionSource>,
    tz: Tz,
}

impl TradingCalendar {
    pub fn new(source: Box<dyn SessionSource>, tz: Tz) -> Self {
        Self { source, tz }
    }

    /// US equity calendar in America/New_York.
    pub fn us_equity() -> Self {
        Self::new(Box::new(UsEquitySessions), US_EXCHANGE_TZ)
    }

    /// Ordered open-market dates in `[start, end]`.
    pub fn sessions(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        self.source.sessions(start, end)
    }

    /// The per-minute epoch-second grid for one session: 04:00 to 20:00
    /// exchange-local, 960 points.
    ///
    /// Stepping in fixed 60s increments from the open instant is exact here:
    /// US DST transitions happen at 02:00 local, outside the grid window.
    pub fn intraday_grid(&self, session: NaiveDate) -> Result<Vec<i64>> {
        let open = self.local_instant(session, GRID_OPEN_HOUR)?;
        let minutes = ((GRID_CLOSE_HOUR - GRID_OPEN_HOUR) * 60) as i64;
        Ok((0..minutes).map(|i| open + i * GRID_STEP_SECS).collect())
    }

    /// Concatenated grid over ordered sessions.
    pub fn grid(&self, sessions: &[NaiveDate]) -> Result<Vec<i64>> {
        let mut out = Vec::with_capacity(sessions.len() * 960);
        for session in sessions {
            out.extend(self.intraday_grid(*session)?);
        }
        Ok(out)
    }

    /// First and last grid point over ordered sessions, if any.
    pub fn grid_bounds(&self, sessions: &[NaiveDate]) -> Result<Option<(i64, i64)>> {
        let (first, last) = match (sessions.first(), sessions.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Ok(None),
        };
        let start = self.local_instant(first, GRID_OPEN_HOUR)?;
        let end = self.local_instant(last, GRID_CLOSE_HOUR)? - GRID_STEP_SECS;
        Ok(Some((start, end)))
    }

    fn local_instant(&self, date: NaiveDate, hour: u32) -> Result<i64> {
        let naive = date
            .and_hms_opt(hour, 0, 0)
            .ok_or_else(|| Error::Calendar(format!("invalid hour {} on {}", hour, date)))?;
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp())
            .ok_or_else(|| Error::Calendar(format!("{} {}:00 does not exist in {}", date, hour, self.tz)))
    }
}

/// Splits `[start, end]` into consecutive inclusive windows of at most
/// `max_days` calendar days, no gaps, no overlaps.
///
/// Used to honor the provider's per-request intraday span limit. Empty for
/// `start > end`.
pub fn partition_range(start: NaiveDate, end: NaiveDate, max_days: u32) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    if start > end || max_days == 0 {
        return windows;
    }
    let span = Duration::days(i64::from(max_days) - 1);
    let mut cursor = start;
    while cursor <= end {
        let window_end = (cursor + span).min(end);
        windows.push((cursor, window_end));
        cursor = window_end + Duration::days(1);
    }
    windows
}
