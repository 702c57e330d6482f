//! Day keys - the canonical calendar-day coordinate of the index
//!
//! A `DayKey` is a `YYYYMMDD` string derived from an event timestamp in
//! local time. Fixed-width digits mean lexicographic order equals calendar
//! order, so keys compare and sort without parsing.

use chrono::{Duration, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

const DAY_KEY_FORMAT: &str = "%Y%m%d";

/// Canonical `YYYYMMDD` key for one local-calendar day
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    /// Key for a calendar date
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(DAY_KEY_FORMAT).to_string())
    }

    /// Key for an event timestamp (Unix millis), resolved in local time
    pub fn from_timestamp_millis(millis: i64) -> Self {
        let date = Local
            .timestamp_millis_opt(millis)
            .earliest()
            .map(|dt| dt.date_naive())
            .unwrap_or_else(|| Local::now().date_naive());
        Self::from_date(date)
    }

    /// Key for today (local calendar)
    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// Parse back to a calendar date. Returns `None` for malformed keys,
    /// which can only come from a corrupted persisted entry.
    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, DAY_KEY_FORMAT).ok()
    }

    /// The key `days` calendar days earlier
    pub fn minus_days(&self, days: u32) -> Self {
        match self.to_date() {
            Some(date) => Self::from_date(date - Duration::days(days as i64)),
            None => self.clone(),
        }
    }

    /// The previous calendar day
    pub fn pred(&self) -> Self {
        self.minus_days(1)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage key for a daily summary: plain day key, or `YYYYMMDD|partition`
/// for modules that split summaries by a secondary dimension (e.g. currency).
pub fn summary_key(day: &DayKey, partition: Option<&str>) -> String {
    match partition {
        Some(p) => format!("{}|{}", day.as_str(), p),
        None => day.as_str().to_string(),
    }
}

/// Iterate day keys over an inclusive calendar range
pub fn day_keys_between(start: NaiveDate, end: NaiveDate) -> Vec<DayKey> {
    let mut keys = Vec::new();
    let mut day = start;
    while day <= end {
        keys.push(DayKey::from_date(day));
        day += Duration::days(1);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_key_format() {
        let key = DayKey::from_date(date(2026, 3, 7));
        assert_eq!(key.as_str(), "20260307");
        assert_eq!(key.to_date(), Some(date(2026, 3, 7)));
    }

    #[test]
    fn test_lexicographic_order_matches_calendar() {
        let a = DayKey::from_date(date(2025, 12, 31));
        let b = DayKey::from_date(date(2026, 1, 1));
        assert!(a < b);
        assert!(b.pred() == a);
    }

    #[test]
    fn test_minus_days_crosses_month() {
        let key = DayKey::from_date(date(2026, 3, 2));
        assert_eq!(key.minus_days(5).as_str(), "20260225");
    }

    #[test]
    fn test_summary_key_partition() {
        let day = DayKey::from_date(date(2026, 1, 15));
        assert_eq!(summary_key(&day, None), "20260115");
        assert_eq!(summary_key(&day, Some("EUR")), "20260115|EUR");
    }

    #[test]
    fn test_day_keys_between_inclusive() {
        let keys = day_keys_between(date(2026, 2, 27), date(2026, 3, 1));
        let strs: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(strs, vec!["20260227", "20260228", "20260301"]);
    }

    #[test]
    fn test_same_day_different_times_share_key() {
        let morning = date(2026, 5, 1).and_hms_opt(6, 30, 0).unwrap();
        let night = date(2026, 5, 1).and_hms_opt(23, 45, 0).unwrap();
        let m = Local.from_local_datetime(&morning).earliest().unwrap();
        let n = Local.from_local_datetime(&night).earliest().unwrap();
        assert_eq!(
            DayKey::from_timestamp_millis(m.timestamp_millis()),
            DayKey::from_timestamp_millis(n.timestamp_millis())
        );
    }
}
