//! Local store gateway.
//!
//! The orchestrator talks to the local store through [`MirrorStore`] and one
//! [`TableLoad`] per table, so a cycle can be driven against SQLite in
//! production and against recording fakes in tests.

use async_trait::async_trait;
use clientdesk_core::mirror::{MirrorRow, MirrorTable, TableSpec};
use clientdesk_db::repositories::MirrorRepo;
use clientdesk_db::DbPool;
use sqlx::{Sqlite, Transaction};

use crate::error::StoreError;

/// Write side of a sync cycle.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Empty `tables`, in the given order, atomically.
    async fn clear_all(&self, tables: &[MirrorTable]) -> Result<(), StoreError>;

    /// Open the transaction one table is loaded in.
    async fn begin_table(&self, spec: &'static TableSpec) -> Result<Box<dyn TableLoad>, StoreError>;
}

/// An open per-table load. Dropping it without [`commit`](Self::commit)
/// discards every chunk written through it.
#[async_trait]
pub trait TableLoad: Send {
    /// Append rows to the table. Returns the number of rows written.
    async fn insert_chunk(&mut self, rows: &[MirrorRow]) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// [`MirrorStore`] over the local SQLite database.
#[derive(Clone)]
pub struct SqliteMirrorStore {
    pool: DbPool,
}

impl SqliteMirrorStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MirrorStore for SqliteMirrorStore {
    async fn clear_all(&self, tables: &[MirrorTable]) -> Result<(), StoreError> {
        Ok(MirrorRepo::clear_all(&self.pool, tables).await?)
    }

    async fn begin_table(&self, spec: &'static TableSpec) -> Result<Box<dyn TableLoad>, StoreError> {
        let tx = MirrorRepo::begin_load(&self.pool).await?;
        Ok(Box::new(SqliteTableLoad { tx, spec }))
    }
}

struct SqliteTableLoad {
    tx: Transaction<'static, Sqlite>,
    spec: &'static TableSpec,
}

#[async_trait]
impl TableLoad for SqliteTableLoad {
    async fn insert_chunk(&mut self, rows: &[MirrorRow]) -> Result<u64, StoreError> {
        Ok(MirrorRepo::insert_chunk(&mut self.tx, self.spec, rows).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let SqliteTableLoad { mut tx, spec } = *self;
        MirrorRepo::restore_preserved(&mut tx, spec).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
