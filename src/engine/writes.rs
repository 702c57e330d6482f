//! Write-path hooks
//!
//! Module write operations call `on_record_added` after a store-level
//! create, `on_record_removed` after a delete, and both (old then new) for
//! an update. Deltas are idempotent on the index side and clamped on the
//! summary side, so interleavings across await points cannot push either
//! map below zero or double-count an ID.

use crate::daykey::summary_key;
use crate::engine::{DateIndexEngine, EngineResult};
use crate::record::DateRecord;

impl<T: DateRecord> DateIndexEngine<T> {
    /// Observe a record that was just created in the store
    pub async fn on_record_added(&self, record: &T) -> EngineResult<()> {
        self.ensure_ready().await?;
        let snapshot = self.ready_snapshot().await;
        let day = record.day_key();

        let mut meta = self.load_meta().await?;
        let mut meta_changed = meta.observe_day(&day);

        let covered = !snapshot.scan_fallback
            && snapshot
                .indexed_from
                .as_ref()
                .map_or(false, |from| day >= *from);

        if covered {
            let mut entry = self.index.get(day.as_str()).await?.unwrap_or_default();
            if entry.insert(record.record_id()) {
                self.index.put(day.as_str(), entry).await?;

                let key = summary_key(&day, record.partition());
                let mut summary = self.summaries.get(&key).await?.unwrap_or_default();
                summary.add(&record.summary_fields());
                self.summaries.put(&key, summary).await?;
            }

            if meta
                .last_indexed_date_key
                .as_ref()
                .map_or(true, |last| *last < day)
            {
                meta.last_indexed_date_key = Some(day.clone());
                meta_changed = true;
            }
        } else if !snapshot.scan_fallback {
            // A write landed in not-yet-backfilled history: leave the index
            // alone, but there is now known-uncovered data
            if meta.backfill_complete {
                meta.backfill_complete = false;
                meta_changed = true;
                tracing::debug!(day = %day, "write before indexed window, backfill reopened");
            }
        }

        if meta_changed {
            self.persist_meta(&meta).await?;
            self.refresh_cache(&meta).await;
        }
        Ok(())
    }

    /// Observe a record that was just deleted from the store. For updates,
    /// call this with the previous version before `on_record_added` with the
    /// new one, so the old contribution is subtracted first.
    pub async fn on_record_removed(&self, record: &T) -> EngineResult<()> {
        self.ensure_ready().await?;
        let snapshot = self.ready_snapshot().await;
        let day = record.day_key();

        let covered = !snapshot.scan_fallback
            && snapshot
                .indexed_from
                .as_ref()
                .map_or(false, |from| day >= *from);
        if !covered {
            return Ok(());
        }

        if let Some(mut entry) = self.index.get(day.as_str()).await? {
            if entry.remove(record.record_id()) {
                if entry.is_empty() {
                    self.index.delete(day.as_str()).await?;
                } else {
                    self.index.put(day.as_str(), entry).await?;
                }
            }
        }

        let key = summary_key(&day, record.partition());
        if let Some(mut summary) = self.summaries.get(&key).await? {
            summary.subtract(&record.summary_fields());
            if summary.total() == 0.0 {
                self.summaries.delete(&key).await?;
            } else {
                self.summaries.put(&key, summary).await?;
            }
        }
        Ok(())
    }
}
