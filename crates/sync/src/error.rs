//! Error taxonomy of a sync cycle.
//!
//! Every variant of [`SyncError`] is contained within the cycle that raised
//! it: the scheduler logs it and carries on, and request handlers never see it.

use std::time::Duration;

use clientdesk_core::mirror::MirrorTable;
use clientdesk_db::repositories::MirrorError;

/// Errors from the remote data source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Source database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Remote query timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from the local store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Local database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

impl From<MirrorError> for StoreError {
    fn from(err: MirrorError) -> Self {
        match err {
            MirrorError::Database(e) => StoreError::Database(e),
            MirrorError::MalformedRow(msg) => StoreError::MalformedRow(msg),
        }
    }
}

/// Why a sync cycle failed.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The remote source could not be reached. Nothing local was touched.
    #[error("Cannot connect to the remote source: {0}")]
    Connection(#[source] SourceError),

    /// The atomic clear failed and was rolled back. The local store still
    /// holds the previous cycle's data.
    #[error("Failed to clear mirrored tables: {0}")]
    Clear(#[source] StoreError),

    #[error("Failed to read {table} at offset {offset}: {source}")]
    ChunkRead {
        table: MirrorTable,
        offset: u64,
        #[source]
        source: SourceError,
    },

    #[error("Failed to write {table} at offset {offset}: {source}")]
    ChunkWrite {
        table: MirrorTable,
        offset: u64,
        #[source]
        source: StoreError,
    },

    #[error("Failed to commit {table}: {source}")]
    Commit {
        table: MirrorTable,
        #[source]
        source: StoreError,
    },

    #[error("Remote read of {table} at offset {offset} timed out")]
    Timeout { table: MirrorTable, offset: u64 },

    #[error("Sync cycle cancelled")]
    Cancelled,

    #[error("Invalid sync configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// The table that was being loaded when the cycle failed, if any.
    pub fn table(&self) -> Option<MirrorTable> {
        match self {
            SyncError::ChunkRead { table, .. }
            | SyncError::ChunkWrite { table, .. }
            | SyncError::Commit { table, .. }
            | SyncError::Timeout { table, .. } => Some(*table),
            _ => None,
        }
    }
}
