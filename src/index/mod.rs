//! Persisted index structures
//!
//! Two derived maps sit next to each module's record store:
//!
//! - **Date index**: day key → ordered, deduplicated list of record IDs
//! - **Daily summary**: day key (or `day|partition`) → flat counter map
//!
//! plus a single [`IndexMetadata`] record tracking coverage and backfill
//! progress. All three are rebuildable from the record store at any time;
//! none of them is the source of truth.

mod metadata;

pub use metadata::{IndexMetadata, META_KEY, SCHEMA_VERSION};

use crate::record::TOTAL_FIELD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record IDs present on one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub ids: Vec<String>,
}

impl IndexEntry {
    /// Append an ID unless already present. Returns whether the entry changed.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.iter().any(|existing| existing == id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    /// Remove an ID if present. Returns whether the entry changed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| existing != id);
        self.ids.len() != before
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Precomputed aggregate for one day (or one day|partition)
///
/// Fields are running deltas kept in step with the index; subtraction clamps
/// at zero to absorb interleaved add/remove on the same day across await
/// points. Every record contributes `total = 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailySummary {
    fields: BTreeMap<String, f64>,
}

impl DailySummary {
    /// Apply a record's contribution: `total` plus the module's fields
    pub fn add(&mut self, fields: &[(&'static str, f64)]) {
        *self.fields.entry(TOTAL_FIELD.to_string()).or_default() += 1.0;
        for (name, delta) in fields {
            *self.fields.entry((*name).to_string()).or_default() += delta;
        }
    }

    /// Reverse a record's contribution, clamping every field at zero
    pub fn subtract(&mut self, fields: &[(&'static str, f64)]) {
        Self::clamp_sub(self.fields.entry(TOTAL_FIELD.to_string()).or_default(), 1.0);
        for (name, delta) in fields {
            Self::clamp_sub(self.fields.entry((*name).to_string()).or_default(), *delta);
        }
    }

    fn clamp_sub(field: &mut f64, delta: f64) {
        *field = (*field - delta).max(0.0);
    }

    /// Merge another summary's counters into this one (backfill chunk merge)
    pub fn merge(&mut self, other: &DailySummary) {
        for (name, delta) in &other.fields {
            *self.fields.entry(name.clone()).or_default() += delta;
        }
    }

    /// Record count for this key
    pub fn total(&self) -> f64 {
        self.get(TOTAL_FIELD)
    }

    pub fn get(&self, field: &str) -> f64 {
        self.fields.get(field).copied().unwrap_or(0.0)
    }

    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }
}
