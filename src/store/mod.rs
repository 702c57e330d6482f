//! Store adapter seam
//!
//! The engine sits on top of opaque per-record collections: point get/put/
//! delete, iterate-all, clear. No ordering, transactions, or range queries
//! are assumed; each write is assumed durable once the call returns. The
//! record store, the date index, the daily summaries, and the metadata
//! record all live in collections behind this one trait.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a store adapter
///
/// Adapter failures indicate an unrecoverable environment problem; the
/// engine propagates them to the caller without retrying or wrapping.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// One opaque key-value collection
#[async_trait]
pub trait KvCollection<V: Clone + Send + Sync + 'static>: Send + Sync {
    /// Point lookup by record ID
    async fn get(&self, id: &str) -> StoreResult<Option<V>>;

    /// Insert or replace; durable on return
    async fn put(&self, id: &str, value: V) -> StoreResult<()>;

    /// Delete if present (no-op otherwise)
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Iterate all entries, in no particular order
    async fn entries(&self) -> StoreResult<Vec<(String, V)>>;

    /// Remove every entry
    async fn clear(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Serialization("bad json".to_string());
        assert_eq!(err.to_string(), "Serialization error: bad json");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();
        assert!(matches!(store_err, StoreError::Io(_)));
    }
}
