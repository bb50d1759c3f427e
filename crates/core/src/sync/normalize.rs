//! Column normalization for provider payloads.
//!
//! Fetched bars arrive with provider-native field names. This module maps
//! them onto the internal row types and enforces the expected column set
//! exactly: a batch with a missing or extra column on any row is rejected
//! whole, never silently dropped or partially accepted. Schema drift on the
//! provider side must surface as a loud validation failure.

use chrono::NaiveDate;
use serde_json::Value;

use gapsync_market_data::RawBar;

use crate::errors::{Error, Result};
use crate::types::{EodRow, IntraRow};

/// Provider column set for EOD bars. `adjusted_close` maps to `adj_close`.
const EOD_COLUMNS: [&str; 7] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "adjusted_close",
    "volume",
];

/// Provider column set for intraday bars. `gmtoffset` and `datetime` are
/// redundant with the epoch timestamp and are dropped.
const INTRA_COLUMNS: [&str; 8] = [
    "timestamp",
    "gmtoffset",
    "datetime",
    "open",
    "high",
    "low",
    "close",
    "volume",
];

/// Maps a batch of provider EOD bars onto [`EodRow`]s.
pub fn normalize_eod(bars: &[RawBar]) -> Result<Vec<EodRow>> {
    bars.iter()
        .map(|bar| {
            check_columns(bar, &EOD_COLUMNS, "eod")?;
            Ok(EodRow {
                date: get_date(bar, "date")?,
                open: get_f64(bar, "open")?,
                high: get_f64(bar, "high")?,
                low: get_f64(bar, "low")?,
                close: get_f64(bar, "close")?,
                adj_close: get_f64(bar, "adjusted_close")?,
                volume: get_i64(bar, "volume")?,
            })
        })
        .collect()
}

/// Maps a batch of provider intraday bars onto [`IntraRow`]s.
pub fn normalize_intra(bars: &[RawBar]) -> Result<Vec<IntraRow>> {
    bars.iter()
        .map(|bar| {
            check_columns(bar, &INTRA_COLUMNS, "intra")?;
            Ok(IntraRow {
                timestamp: get_i64(bar, "timestamp")?,
                open: get_f64(bar, "open")?,
                high: get_f64(bar, "high")?,
                low: get_f64(bar, "low")?,
                close: get_f64(bar, "close")?,
                volume: get_opt_i64(bar, "volume")?,
            })
        })
        .collect()
}

fn check_columns(bar: &RawBar, expected: &[&str], kind: &str) -> Result<()> {
    let missing: Vec<&str> = expected
        .iter()
        .filter(|c| !bar.contains_key(**c))
        .copied()
        .collect();
    let extra: Vec<&str> = bar
        .keys()
        .filter(|k| !expected.contains(&k.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() || !extra.is_empty() {
        return Err(Error::Validation(format!(
            "{} bar column mismatch: missing [{}], unexpected [{}]",
            kind,
            missing.join(", "),
            extra.join(", ")
        )));
    }
    Ok(())
}

fn get_date(bar: &RawBar, key: &str) -> Result<NaiveDate> {
    let raw = bar
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation(format!("field '{}' is not a string", key)))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| Error::Validation(format!("field '{}' = '{}': {}", key, raw, e)))
}

fn get_f64(bar: &RawBar, key: &str) -> Result<f64> {
    bar.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::Validation(format!("field '{}' is not a number", key)))
}

fn get_i64(bar: &RawBar, key: &str) -> Result<i64> {
    bar.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Validation(format!("field '{}' is not an integer", key)))
}

fn get_opt_i64(bar: &RawBar, key: &str) -> Result<Option<i64>> {
    match bar.get(key) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::Validation(format!("field '{}' is not an integer", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eod_bar() -> RawBar {
        match json!({
            "date": "2023-01-03",
            "open": 130.28,
            "high": 130.9,
            "low": 124.17,
            "close": 125.07,
            "adjusted_close": 124.22,
            "volume": 112117500,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn intra_bar() -> RawBar {
        match json!({
            "timestamp": 1672752600,
            "gmtoffset": 0,
            "datetime": "2023-01-03 14:30:00",
            "open": 130.28,
            "high": 130.3,
            "low": 130.1,
            "close": 130.2,
            "volume": 52100,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_normalize_eod_maps_adjusted_close() {
        let rows = normalize_eod(&[eod_bar()]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2023, 1, 3).unwrap());
        assert_eq!(rows[0].adj_close, 124.22);
        assert_eq!(rows[0].volume, 112_117_500);
    }

    #[test]
    fn test_normalize_intra_drops_gmtoffset_and_datetime() {
        let rows = normalize_intra(&[intra_bar()]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, 1_672_752_600);
        assert_eq!(rows[0].volume, Some(52_100));
    }

    #[test]
    fn test_missing_column_rejects_whole_batch() {
        let mut bad = eod_bar();
        bad.remove("close");
        let err = normalize_eod(&[eod_bar(), bad]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("missing [close]"));
    }

    #[test]
    fn test_extra_column_rejects_whole_batch() {
        let mut bad = eod_bar();
        bad.insert("vwap".to_string(), json!(1.0));
        let err = normalize_eod(&[bad]).unwrap_err();
        assert!(err.to_string().contains("unexpected [vwap]"));
    }

    #[test]
    fn test_malformed_date_is_validation_error() {
        let mut bad = eod_bar();
        bad.insert("date".to_string(), json!("03/01/2023"));
        assert!(matches!(
            normalize_eod(&[bad]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_null_intra_volume_is_allowed() {
        let mut bar = intra_bar();
        bar.insert("volume".to_string(), Value::Null);
        let rows = normalize_intra(&[bar]).unwrap();
        assert_eq!(rows[0].volume, None);
    }

    #[test]
    fn test_empty_batch_is_ok() {
        assert!(normalize_eod(&[]).unwrap().is_empty());
        assert!(normalize_intra(&[]).unwrap().is_empty());
    }
}
