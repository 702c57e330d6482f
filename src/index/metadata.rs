//! Index metadata - one persisted record per engine instance
//!
//! Tracks what the index covers (`indexed_from_date_key` .. today), where
//! the raw data ends (`oldest_data_date_key`), and the backfill/rebuild
//! flags. A missing record means first run.

use crate::daykey::DayKey;
use serde::{Deserialize, Serialize};

/// Compiled-in shape version of the index and summary records.
/// Bump whenever either shape changes; a mismatch forces a window rebuild.
pub const SCHEMA_VERSION: u32 = 1;

/// Fixed key the metadata record is stored under
pub const META_KEY: &str = "index_meta";

/// Coverage and backfill state for one module's date index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub version: u32,

    /// Earliest day fully covered by the index; the index covers
    /// `[indexed_from_date_key, today]`. Absent until the first bootstrap.
    #[serde(default)]
    pub indexed_from_date_key: Option<DayKey>,

    /// Earliest day key seen in the raw record store, updated
    /// opportunistically by scans and pre-coverage writes
    #[serde(default)]
    pub oldest_data_date_key: Option<DayKey>,

    /// Most recent day key that received an indexed write
    #[serde(default)]
    pub last_indexed_date_key: Option<DayKey>,

    pub backfill_complete: bool,
    pub backfill_paused: bool,

    /// Set when integrity validation fails, cleared once a rebuild succeeds
    #[serde(default)]
    pub rebuild_needed: bool,
}

impl IndexMetadata {
    /// First-run defaults: nothing covered yet, backfill pending
    pub fn first_run() -> Self {
        Self {
            version: SCHEMA_VERSION,
            indexed_from_date_key: None,
            oldest_data_date_key: None,
            last_indexed_date_key: None,
            backfill_complete: false,
            backfill_paused: false,
            rebuild_needed: false,
        }
    }

    /// Post-reset state: empty store, coverage starts today, nothing to backfill
    pub fn reset_to_today() -> Self {
        let today = DayKey::today();
        Self {
            version: SCHEMA_VERSION,
            indexed_from_date_key: Some(today.clone()),
            oldest_data_date_key: None,
            last_indexed_date_key: Some(today),
            backfill_complete: true,
            backfill_paused: false,
            rebuild_needed: false,
        }
    }

    /// Track a newly observed day key as a candidate oldest-data boundary.
    /// Returns whether the field changed.
    pub fn observe_day(&mut self, day: &DayKey) -> bool {
        match &self.oldest_data_date_key {
            Some(oldest) if oldest <= day => false,
            _ => {
                self.oldest_data_date_key = Some(day.clone());
                true
            }
        }
    }
}
