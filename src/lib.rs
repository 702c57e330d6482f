//! # Daydex
//!
//! Incremental date-indexed storage layer: maintains a day-key → record-ID
//! index and a precomputed daily-summary cache on top of an opaque per-record
//! key-value store, so feature modules get fast "records for this date range"
//! and "daily totals" reads over years of data without full-history scans.
//!
//! ## How it works
//!
//! - **Bootstrap**: first access per engine instance indexes only the most
//!   recent 30 days and cross-checks index/summary totals against the store;
//!   drift triggers one rebuild, persistent drift degrades reads to full
//!   scans rather than failing.
//! - **Write path**: module writes notify the engine after each store-level
//!   create/delete; the engine keeps the covered window exact with
//!   idempotent index appends and clamped summary deltas.
//! - **Backfill**: an external driver extends coverage backward in bounded
//!   chunks; aggregation runs isolated on the blocking pool over plain data.
//! - **Read router**: indexed reads inside coverage, split reads across the
//!   boundary, full scans only for uncovered or degraded cases.
//!
//! ## Modules
//!
//! - [`engine`]: the date-index engine and its operations
//! - [`store`]: the opaque key-value collection contract plus two adapters
//! - [`index`]: persisted index, summary, and metadata shapes
//! - [`record`]: the record contract modules implement
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use daydex::{DateIndexEngine, DateRecord, KvCollection, MemoryStore};
//! use std::sync::Arc;
//!
//! #[derive(Clone)]
//! struct MoodEntry {
//!     id: String,
//!     logged_at_millis: i64,
//!     score: f64,
//! }
//!
//! impl DateRecord for MoodEntry {
//!     fn record_id(&self) -> &str {
//!         &self.id
//!     }
//!     fn event_timestamp_millis(&self) -> i64 {
//!         self.logged_at_millis
//!     }
//!     fn summary_fields(&self) -> Vec<(&'static str, f64)> {
//!         vec![("scoreSum", self.score)]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let records: Arc<MemoryStore<MoodEntry>> = Arc::new(MemoryStore::new());
//!     let engine = DateIndexEngine::new(
//!         records.clone(),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(MemoryStore::new()),
//!     );
//!
//!     let entry = MoodEntry {
//!         id: "m1".into(),
//!         logged_at_millis: chrono::Utc::now().timestamp_millis(),
//!         score: 7.0,
//!     };
//!     records.put(&entry.id.clone(), entry.clone()).await?;
//!     engine.on_record_added(&entry).await?;
//!
//!     let today = chrono::Local::now().date_naive();
//!     let entries = engine.read_date(today).await?;
//!     println!("{} mood entries today", entries.len());
//!
//!     // Session driver: advance backfill a bounded number of chunks
//!     while engine.backfill_next_chunk(30).await? {}
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod daykey;
pub mod engine;
pub mod index;
pub mod record;
pub mod store;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError, EngineConfig, LoggingConfig};
pub use daykey::{day_keys_between, summary_key, DayKey};
pub use engine::{DateIndexEngine, EngineError, EngineResult, EngineStatus};
pub use index::{DailySummary, IndexEntry, IndexMetadata, SCHEMA_VERSION};
pub use record::{DateRecord, TOTAL_FIELD};
pub use store::{JsonFileStore, KvCollection, MemoryStore, StoreError, StoreResult};
