//! Engine error types

use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by engine operations
///
/// Bootstrap and integrity failures never appear here; they are absorbed
/// into degraded-mode flags so the surrounding application stays usable.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Underlying store adapter failed; propagated unchanged
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid date range (start after end)
    #[error("invalid date range: start is after end")]
    InvalidRange,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
