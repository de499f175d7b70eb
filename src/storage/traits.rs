//! Storage traits and error types
//!
//! This module defines the trait interface for result stores and
//! associated error types.

use crate::record::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for result store implementations
///
/// The coordinator always writes the complete recomputed result set, so a
/// store never needs merge semantics.
pub trait Store {
    /// Loads previously persisted records
    ///
    /// A missing or unreadable store yields an empty sequence; problems are
    /// logged, never returned.
    fn load(&self) -> Vec<Record>;

    /// Replaces the persisted content with `records`
    fn save(&self, records: &[Record]) -> StorageResult<()>;
}
