//! Backfill scheduler
//!
//! Extends indexed coverage backward one fixed-size chunk of days per call.
//! The store scan stays on the caller's task (with cooperative yields); the
//! CPU-bound aggregation of the collected chunk runs on the blocking pool as
//! a pure function over plain owned data, so nothing aliases the live maps.
//! Progress is persisted after each chunk, which makes backfill resumable
//! across processes, and an external session driver bounds total work per
//! session by capping calls and sleeping between them.

use crate::daykey::{summary_key, DayKey};
use crate::engine::{DateIndexEngine, EngineResult};
use crate::index::{DailySummary, IndexEntry};
use crate::record::DateRecord;
use std::collections::HashMap;

/// Plain, serializable projection of one record - everything the
/// aggregation worker needs and nothing it could alias
#[derive(Debug, Clone)]
struct ChunkEntry {
    id: String,
    day: DayKey,
    partition: Option<String>,
    fields: Vec<(&'static str, f64)>,
}

/// Owned index/summary deltas for one chunk
#[derive(Debug, Default)]
struct ChunkAggregate {
    index: HashMap<String, IndexEntry>,
    summaries: HashMap<String, DailySummary>,
}

/// Pure aggregation of a chunk's entries into delta maps
fn aggregate_chunk(entries: Vec<ChunkEntry>) -> ChunkAggregate {
    let mut aggregate = ChunkAggregate::default();
    for entry in entries {
        let changed = aggregate
            .index
            .entry(entry.day.as_str().to_string())
            .or_default()
            .insert(&entry.id);
        if changed {
            aggregate
                .summaries
                .entry(summary_key(&entry.day, entry.partition.as_deref()))
                .or_default()
                .add(&entry.fields);
        }
    }
    aggregate
}

impl<T: DateRecord> DateIndexEngine<T> {
    /// Index one more chunk of history. Returns true if coverage advanced.
    ///
    /// Intended to be invoked repeatedly by an external driver with a small
    /// delay between calls; pause/resume applies at these boundaries only.
    pub async fn backfill_next_chunk(&self, chunk_days: u32) -> EngineResult<bool> {
        self.ensure_ready().await?;
        if self.ready_snapshot().await.scan_fallback {
            // An untrusted index must not be extended over more history
            tracing::debug!("backfill skipped: running in scan-fallback mode");
            return Ok(false);
        }

        let mut meta = self.load_meta().await?;
        if meta.backfill_paused || meta.backfill_complete {
            return Ok(false);
        }
        let Some(indexed_from) = meta.indexed_from_date_key.clone() else {
            return Ok(false);
        };
        let Some(oldest) = meta.oldest_data_date_key.clone() else {
            // Nothing older than coverage is known to exist
            meta.backfill_complete = true;
            self.persist_meta(&meta).await?;
            self.refresh_cache(&meta).await;
            return Ok(false);
        };
        if oldest >= indexed_from {
            meta.backfill_complete = true;
            self.persist_meta(&meta).await?;
            self.refresh_cache(&meta).await;
            return Ok(false);
        }

        let chunk_end = indexed_from.pred();
        let lower = chunk_end.minus_days(chunk_days.max(1) - 1);
        let chunk_start = if oldest > lower { oldest.clone() } else { lower };

        // Collect the chunk as plain tuples
        let mut chunk: Vec<ChunkEntry> = Vec::new();
        for (processed, (_, record)) in self.records.entries().await?.iter().enumerate() {
            self.maybe_yield(processed).await;
            let day = record.day_key();
            if day >= chunk_start && day <= chunk_end {
                chunk.push(ChunkEntry {
                    id: record.record_id().to_string(),
                    day,
                    partition: record.partition().map(str::to_string),
                    fields: record.summary_fields(),
                });
            }
        }

        let collected = chunk.len();
        let aggregate = match tokio::task::spawn_blocking(move || aggregate_chunk(chunk)).await {
            Ok(aggregate) => aggregate,
            Err(e) => {
                // Chunk not progressed; metadata untouched so the same chunk
                // is retried on the next invocation
                tracing::warn!("backfill chunk aggregation failed: {e}");
                return Ok(false);
            }
        };

        // Merge the owned deltas into the persisted maps (batched writes)
        for (day, delta) in aggregate.index {
            let mut entry = self.index.get(&day).await?.unwrap_or_default();
            let mut changed = false;
            for id in &delta.ids {
                changed |= entry.insert(id);
            }
            if changed {
                self.index.put(&day, entry).await?;
            }
        }
        for (key, delta) in aggregate.summaries {
            let mut summary = self.summaries.get(&key).await?.unwrap_or_default();
            summary.merge(&delta);
            self.summaries.put(&key, summary).await?;
        }

        meta.indexed_from_date_key = Some(chunk_start.clone());
        meta.backfill_complete = chunk_start <= oldest;
        self.persist_meta(&meta).await?;
        self.refresh_cache(&meta).await;

        tracing::info!(
            chunk_start = %chunk_start,
            chunk_end = %chunk_end,
            records = collected,
            backfill_complete = meta.backfill_complete,
            "backfilled one chunk"
        );
        Ok(true)
    }

    /// Pause or resume backfill; takes effect at the next chunk boundary
    pub async fn set_backfill_paused(&self, paused: bool) -> EngineResult<()> {
        self.ensure_ready().await?;
        let mut meta = self.load_meta().await?;
        if meta.backfill_paused != paused {
            meta.backfill_paused = paused;
            self.persist_meta(&meta).await?;
            tracing::info!(paused, "backfill pause flag changed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::*;
    use crate::store::KvCollection;

    #[tokio::test]
    async fn test_chunks_walk_backward_to_completion() {
        let t = TestEngine::build();
        // 100 days of history: bootstrap covers 30, backfill owes 70
        for days_ago in 0..100 {
            t.seed(record(&format!("r{days_ago}"), days_ago)).await;
        }
        t.engine.ensure_ready().await.unwrap();

        let mut cursors = Vec::new();
        while t.engine.backfill_next_chunk(30).await.unwrap() {
            let status = t.engine.status().await.unwrap();
            cursors.push(status.indexed_from_date_key.unwrap());
        }

        // Monotonically backward: 30 days per chunk until the oldest record
        let expected: Vec<DayKey> = vec![
            DayKey::today().minus_days(59),
            DayKey::today().minus_days(89),
            DayKey::today().minus_days(99),
        ];
        assert_eq!(cursors, expected);

        let status = t.engine.status().await.unwrap();
        assert!(status.backfill_complete);
        // Terminal state: further calls make no progress
        assert!(!t.engine.backfill_next_chunk(30).await.unwrap());

        // The whole history is now served by indexed reads
        assert_eq!(t.index.len().await, 100);
        let today = chrono::Local::now().date_naive();
        let all = t
            .engine
            .read_range(today - chrono::Duration::days(120), today)
            .await
            .unwrap();
        assert_eq!(all.len(), 100);
    }

    #[tokio::test]
    async fn test_backfill_resumes_across_processes() {
        let t = TestEngine::build();
        for days_ago in 0..100 {
            t.seed(record(&format!("r{days_ago}"), days_ago)).await;
        }
        t.engine.ensure_ready().await.unwrap();
        assert!(t.engine.backfill_next_chunk(30).await.unwrap());
        let cursor_before = t
            .engine
            .status()
            .await
            .unwrap()
            .indexed_from_date_key
            .unwrap();

        // "Restart": a fresh engine over the same collections continues from
        // the persisted cursor instead of today
        let reopened = t.reopen();
        assert!(reopened.backfill_next_chunk(30).await.unwrap());
        let cursor_after = reopened
            .status()
            .await
            .unwrap()
            .indexed_from_date_key
            .unwrap();
        assert_eq!(cursor_after, cursor_before.minus_days(30));
    }

    #[tokio::test]
    async fn test_pause_blocks_progress() {
        let t = TestEngine::build();
        for days_ago in 0..60 {
            t.seed(record(&format!("r{days_ago}"), days_ago)).await;
        }
        t.engine.set_backfill_paused(true).await.unwrap();
        assert!(!t.engine.backfill_next_chunk(30).await.unwrap());

        t.engine.set_backfill_paused(false).await.unwrap();
        assert!(t.engine.backfill_next_chunk(30).await.unwrap());
        assert!(t.engine.status().await.unwrap().backfill_complete);
    }

    #[tokio::test]
    async fn test_noop_when_already_complete() {
        let t = TestEngine::build();
        t.seed(record("a", 3)).await;
        t.engine.ensure_ready().await.unwrap();
        assert!(t.engine.status().await.unwrap().backfill_complete);
        assert!(!t.engine.backfill_next_chunk(30).await.unwrap());
    }

    #[tokio::test]
    async fn test_summary_parity_after_backfill() {
        let t = TestEngine::build();
        for days_ago in 0..50 {
            t.seed(TestRecord {
                minutes: 60.0 * (days_ago as f64 % 3.0 + 6.0),
                ..record(&format!("r{days_ago}"), days_ago)
            })
            .await;
        }
        t.engine.ensure_ready().await.unwrap();
        while t.engine.backfill_next_chunk(14).await.unwrap() {}

        // Every indexed day's cached summary equals a fresh recomputation
        let today = chrono::Local::now().date_naive();
        for days_ago in 0..50i64 {
            let date = today - chrono::Duration::days(days_ago);
            let cached = t.engine.daily_summary(date, None).await.unwrap();
            let mut recomputed = DailySummary::default();
            for (_, rec) in t.records.entries().await.unwrap() {
                if rec.day_key() == DayKey::from_date(date) {
                    recomputed.add(&rec.summary_fields());
                }
            }
            assert_eq!(cached, recomputed, "summary drift on {date}");
        }
    }

    #[test]
    fn test_aggregate_chunk_is_pure_and_deduplicated() {
        let entries = vec![
            ChunkEntry {
                id: "a".into(),
                day: DayKey::today().minus_days(40),
                partition: None,
                fields: vec![("mainSleep", 1.0), ("totalMinutes", 420.0)],
            },
            // Duplicate ID on the same day must not double-count
            ChunkEntry {
                id: "a".into(),
                day: DayKey::today().minus_days(40),
                partition: None,
                fields: vec![("mainSleep", 1.0), ("totalMinutes", 420.0)],
            },
            ChunkEntry {
                id: "b".into(),
                day: DayKey::today().minus_days(41),
                partition: Some("EUR".into()),
                fields: vec![("expense_amount", 12.5)],
            },
        ];

        let aggregate = aggregate_chunk(entries);
        assert_eq!(aggregate.index.len(), 2);

        let day_a = DayKey::today().minus_days(40);
        assert_eq!(aggregate.index[day_a.as_str()].len(), 1);
        assert_eq!(aggregate.summaries[day_a.as_str()].total(), 1.0);

        let day_b = DayKey::today().minus_days(41);
        let key_b = summary_key(&day_b, Some("EUR"));
        assert_eq!(aggregate.summaries[&key_b].get("expense_amount"), 12.5);
    }
}
