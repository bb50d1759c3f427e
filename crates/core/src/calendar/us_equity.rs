//! Full-session calendar rules for the US equity venues (NYSE/Nasdaq).
//!
//! Weekends plus the observed market holidays: New Year's Day, MLK Day,
//! Washington's Birthday, Good Friday, Memorial Day, Juneteenth (observed
//! since 2022), Independence Day, Labor Day, Thanksgiving and Christmas.
//! Saturday holidays are observed the preceding Friday, Sunday holidays the
//! following Monday. Early-close half days are still full sessions here.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashSet;

use super::SessionSource;
use crate::errors::Result;

/// First year the exchanges closed for Juneteenth.
const JUNETEENTH_FIRST_YEAR: i32 = 2022;

/// US equity session source.
pub struct UsEquitySessions;

impl SessionSource for UsEquitySessions {
    fn sessions(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        if start > end {
            return Ok(Vec::new());
        }

        // Observed New Year's of year Y+1 can land on Dec 31 of year Y.
        let mut holidays = HashSet::new();
        for year in start.year()..=end.year() + 1 {
            holidays.extend(holidays_for_year(year));
        }

        let mut sessions = Vec::new();
        let mut current = start;
        while current <= end {
            let weekday = current.weekday();
            if weekday != Weekday::Sat && weekday != Weekday::Sun && !holidays.contains(&current) {
                sessions.push(current);
            }
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(sessions)
    }
}

fn holidays_for_year(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(10);

    if let Some(d) = ymd(year, 1, 1) {
        days.push(observed(d));
    }
    days.push(nth_weekday(year, 1, Weekday::Mon, 3)); // MLK Day
    days.push(nth_weekday(year, 2, Weekday::Mon, 3)); // Washington's Birthday
    days.push(easter_sunday(year) - Duration::days(2)); // Good Friday
    days.push(last_weekday(year, 5, Weekday::Mon)); // Memorial Day
    if year >= JUNETEENTH_FIRST_YEAR {
        if let Some(d) = ymd(year, 6, 19) {
            days.push(observed(d));
        }
    }
    if let Some(d) = ymd(year, 7, 4) {
        days.push(observed(d));
    }
    days.push(nth_weekday(year, 9, Weekday::Mon, 1)); // Labor Day
    days.push(nth_weekday(year, 11, Weekday::Thu, 4)); // Thanksgiving
    if let Some(d) = ymd(year, 12, 25) {
        days.push(observed(d));
    }

    days
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Saturday holidays observed Friday, Sunday holidays observed Monday.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

/// The nth occurrence (1-based) of `weekday` in the month.
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    // The 1st..7th of the month always contains the first occurrence.
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
    let offset = (7 + weekday.num_days_from_monday() as i64
        - first.weekday().num_days_from_monday() as i64)
        % 7;
    first + Duration::days(offset + 7 * (i64::from(n) - 1))
}

/// The last occurrence of `weekday` in the month.
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .unwrap_or_default();
    let last = first_of_next - Duration::days(1);
    let offset = (7 + last.weekday().num_days_from_monday() as i64
        - weekday.num_days_from_monday() as i64)
        % 7;
    last - Duration::days(offset)
}

/// Gregorian computus (anonymous algorithm).
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = ((h + l - 7 * m + 114) % 31) + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).unwrap_or_default()
}
