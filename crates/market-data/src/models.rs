//! Payload models for provider responses.

use chrono::NaiveDate;
use serde_json::{Map, Value};

/// One bar as returned by the provider, field names untouched.
///
/// EOD bars carry `date, open, high, low, close, adjusted_close, volume`;
/// intraday bars carry `timestamp, gmtoffset, datetime, open, high, low,
/// close, volume`. The consumer is responsible for mapping these onto its
/// own schema and for rejecting unexpected shapes.
pub type RawBar = Map<String, Value>;

/// A batch of provider bars.
pub type RawBars = Vec<RawBar>;

/// The slice of fundamentals the sync engine needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fundamentals {
    /// Listing (IPO) date, when the provider knows it.
    pub ipo_date: Option<NaiveDate>,
}

impl Fundamentals {
    /// Builds fundamentals from the provider's IPO-date payload.
    ///
    /// Accepts either the bare filtered value (`"1980-12-12"`) or the
    /// enclosing object (`{"IPODate": "1980-12-12"}`). Placeholder dates
    /// such as `"0000-00-00"` and JSON `null` map to `None`.
    pub fn from_ipo_value(value: &Value) -> Self {
        let raw = match value {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map.get("IPODate").and_then(Value::as_str),
            _ => None,
        };
        let ipo_date = raw.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
        Self { ipo_date }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ipo_date_from_bare_string() {
        let fund = Fundamentals::from_ipo_value(&json!("1980-12-12"));
        assert_eq!(
            fund.ipo_date,
            Some(NaiveDate::from_ymd_opt(1980, 12, 12).unwrap())
        );
    }

    #[test]
    fn test_ipo_date_from_object() {
        let fund = Fundamentals::from_ipo_value(&json!({"IPODate": "2015-06-01"}));
        assert_eq!(
            fund.ipo_date,
            Some(NaiveDate::from_ymd_opt(2015, 6, 1).unwrap())
        );
    }

    #[test]
    fn test_placeholder_ipo_date_is_none() {
        let fund = Fundamentals::from_ipo_value(&json!("0000-00-00"));
        assert_eq!(fund.ipo_date, None);
    }

    #[test]
    fn test_null_ipo_date_is_none() {
        let fund = Fundamentals::from_ipo_value(&Value::Null);
        assert_eq!(fund.ipo_date, None);
    }
}
