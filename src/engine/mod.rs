//! Date index engine
//!
//! One engine instance owns the date index, daily summary cache, and index
//! metadata for a single module's record store. Every operation first runs
//! the bootstrap/integrity path (idempotent, memoized per instance); writes
//! then flow through the index maintenance hooks, reads through the range
//! router, and history is backfilled chunk by chunk by an external driver.
//!
//! ```text
//! Write: store put → on_record_added → index append + summary delta
//! Read:  read_range → covered? indexed lookups : split / full scan
//! Backfill: chunk scan → isolated aggregation → merged deltas → cursor moves back
//! ```

mod backfill;
mod bootstrap;
mod error;
mod reads;
mod writes;

pub use error::{EngineError, EngineResult};

use crate::config::EngineConfig;
use crate::daykey::DayKey;
use crate::index::{DailySummary, IndexEntry, IndexMetadata, META_KEY};
use crate::record::DateRecord;
use crate::store::KvCollection;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-instance memoized bootstrap state
///
/// `bootstrapped` flips once per instance lifetime; `indexed_from` and
/// `backfill_complete` mirror the persisted metadata so the read router
/// does not pay a metadata fetch per call.
#[derive(Debug, Default)]
struct ReadyState {
    bootstrapped: bool,
    scan_fallback: bool,
    indexed_from: Option<DayKey>,
    backfill_complete: bool,
}

/// Coverage snapshot handed to the read/write/backfill paths
#[derive(Debug, Clone)]
pub(crate) struct ReadySnapshot {
    pub scan_fallback: bool,
    pub indexed_from: Option<DayKey>,
    pub backfill_complete: bool,
}

/// Engine status exposed to module code and settings surfaces
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub ready: bool,
    pub using_scan_fallback: bool,
    pub backfill_complete: bool,
    pub backfill_paused: bool,
    pub indexed_from_date_key: Option<DayKey>,
    pub oldest_data_date_key: Option<DayKey>,
    pub last_indexed_date_key: Option<DayKey>,
    pub bootstrap_window_days: u32,
}

/// Incremental date-indexed storage layer over one module's record store
pub struct DateIndexEngine<T: DateRecord> {
    config: EngineConfig,
    records: Arc<dyn KvCollection<T>>,
    index: Arc<dyn KvCollection<IndexEntry>>,
    summaries: Arc<dyn KvCollection<DailySummary>>,
    meta: Arc<dyn KvCollection<IndexMetadata>>,
    ready: RwLock<ReadyState>,
}

impl<T: DateRecord> DateIndexEngine<T> {
    /// Create an engine over the module's four collections
    pub fn new(
        records: Arc<dyn KvCollection<T>>,
        index: Arc<dyn KvCollection<IndexEntry>>,
        summaries: Arc<dyn KvCollection<DailySummary>>,
        meta: Arc<dyn KvCollection<IndexMetadata>>,
    ) -> Self {
        Self::with_config(EngineConfig::default(), records, index, summaries, meta)
    }

    /// Create with custom tuning knobs
    pub fn with_config(
        config: EngineConfig,
        records: Arc<dyn KvCollection<T>>,
        index: Arc<dyn KvCollection<IndexEntry>>,
        summaries: Arc<dyn KvCollection<DailySummary>>,
        meta: Arc<dyn KvCollection<IndexMetadata>>,
    ) -> Self {
        Self {
            config,
            records,
            index,
            summaries,
            meta,
            ready: RwLock::new(ReadyState::default()),
        }
    }

    /// Current coverage and backfill state
    pub async fn status(&self) -> EngineResult<EngineStatus> {
        self.ensure_ready().await?;
        let snapshot = self.ready_snapshot().await;
        let meta = self.load_meta().await?;

        Ok(EngineStatus {
            ready: true,
            using_scan_fallback: snapshot.scan_fallback,
            backfill_complete: meta.backfill_complete,
            backfill_paused: meta.backfill_paused,
            indexed_from_date_key: meta.indexed_from_date_key,
            oldest_data_date_key: meta.oldest_data_date_key,
            last_indexed_date_key: meta.last_indexed_date_key,
            bootstrap_window_days: self.config.bootstrap_window_days,
        })
    }

    /// Full module data reset: deletes all records, clears index and
    /// summaries, and resets metadata to "today, fully indexed, nothing to
    /// backfill". The ready state is rewritten under its lock so no partial
    /// state is observable afterward.
    pub async fn clear_all(&self) -> EngineResult<()> {
        let mut ready = self.ready.write().await;

        self.records.clear().await?;
        self.index.clear().await?;
        self.summaries.clear().await?;

        let meta = IndexMetadata::reset_to_today();
        self.meta.put(META_KEY, meta.clone()).await?;

        ready.bootstrapped = true;
        ready.scan_fallback = false;
        ready.indexed_from = meta.indexed_from_date_key.clone();
        ready.backfill_complete = true;

        tracing::info!("cleared all records and reset date index");
        Ok(())
    }

    pub(crate) async fn ready_snapshot(&self) -> ReadySnapshot {
        let ready = self.ready.read().await;
        ReadySnapshot {
            scan_fallback: ready.scan_fallback,
            indexed_from: ready.indexed_from.clone(),
            backfill_complete: ready.backfill_complete,
        }
    }

    /// Metadata record, or first-run defaults when absent
    pub(crate) async fn load_meta(&self) -> EngineResult<IndexMetadata> {
        Ok(self
            .meta
            .get(META_KEY)
            .await?
            .unwrap_or_else(IndexMetadata::first_run))
    }

    pub(crate) async fn persist_meta(&self, meta: &IndexMetadata) -> EngineResult<()> {
        self.meta.put(META_KEY, meta.clone()).await?;
        Ok(())
    }

    /// Mirror persisted coverage fields into the in-memory ready cache
    pub(crate) async fn refresh_cache(&self, meta: &IndexMetadata) {
        let mut ready = self.ready.write().await;
        ready.indexed_from = meta.indexed_from_date_key.clone();
        ready.backfill_complete = meta.backfill_complete;
    }

    /// Cooperative yield during full-store scans
    pub(crate) async fn maybe_yield(&self, processed: usize) {
        let every = self.config.scan_yield_every.max(1);
        if processed > 0 && processed % every == 0 {
            tokio::task::yield_now().await;
        }
    }
}
