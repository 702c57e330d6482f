//! The record contract between a feature module and the engine
//!
//! Each module (sleep sessions, transactions, mood entries, ...) owns its
//! record type and store; the engine only needs an ID, an event timestamp to
//! derive the day key from, and the counter deltas the record contributes to
//! its day's summary.

use crate::daykey::DayKey;

/// Counter name for the per-record count every summary carries.
/// The engine owns this field; module deltas must not emit it.
pub const TOTAL_FIELD: &str = "total";

/// A time-stamped domain record the engine can index by calendar day
pub trait DateRecord: Clone + Send + Sync + 'static {
    /// Unique record ID within the module's store
    fn record_id(&self) -> &str;

    /// The event timestamp the record is indexed by (Unix millis) -
    /// bed time, transaction date, logged-at time, etc.
    fn event_timestamp_millis(&self) -> i64;

    /// Optional secondary summary dimension (e.g. currency). Records with
    /// different partitions on the same day accumulate separate summaries.
    fn partition(&self) -> Option<&str> {
        None
    }

    /// Module-specific counter deltas this record contributes to its day's
    /// summary (e.g. `[("nap", 1.0), ("totalMinutes", 45.0)]`). The engine
    /// adds `total` itself.
    fn summary_fields(&self) -> Vec<(&'static str, f64)>;

    /// Day key derived from the event timestamp in local time
    fn day_key(&self) -> DayKey {
        DayKey::from_timestamp_millis(self.event_timestamp_millis())
    }
}
