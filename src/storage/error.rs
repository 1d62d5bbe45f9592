//! Storage layer error types.

use crate::storage::page::{PageId, TableId};
use crate::transaction::TransactionId;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A lock acquisition ran past its deadline. The caller owns the cleanup
    /// and must complete the transaction with abort.
    #[error("transaction {0} aborted: lock acquisition deadline exceeded")]
    TransactionAborted(TransactionId),

    #[error("no table owns page {0}")]
    PageNotFound(PageId),

    #[error("table {0} is not registered in the catalog")]
    TableNotFound(TableId),

    /// Every buffered page is dirty, so nothing can be evicted without
    /// writing uncommitted data. The caller may retry after a transaction
    /// completes.
    #[error("cannot evict: all buffered pages are dirty")]
    NoEvictableVictim,

    #[error("page is full: requires {required} bytes but only {available} available")]
    PageFull { required: usize, available: usize },

    #[error("tuple not found: slot {slot} is empty or deleted")]
    TupleNotFound { slot: u16 },

    #[error("invalid slot {slot} (max: {max})")]
    InvalidSlot { slot: u16, max: u16 },

    #[error("tuple has no record id; it was never stored")]
    MissingRecordId,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal bug; not recoverable.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
