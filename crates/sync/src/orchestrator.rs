//! The sync cycle.
//!
//! ```text
//! Idle -> Connecting -> Clearing -> Syncing(table)... -> Committed -> Idle
//!                 \           \            \
//!                  +-----------+------------+--> Failed -> Idle
//! ```
//!
//! Phase 1 clears every mirrored table child-to-parent in one transaction.
//! Phase 2 loads each table parent-to-child in chunks; a table is committed
//! once all of its chunks are written. A failure in phase 2 rolls back the
//! table being loaded only: tables committed earlier in the cycle stay
//! committed, and the next cycle replaces everything again.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use clientdesk_core::mirror::{MirrorTable, TableSpec};
use clientdesk_core::types::Timestamp;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{SourceError, SyncError};
use crate::source::MirrorSource;
use crate::store::{MirrorStore, TableLoad};

// ---------------------------------------------------------------------------
// State and reports
// ---------------------------------------------------------------------------

/// Phase of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Connecting,
    Clearing,
    Syncing { table: MirrorTable },
    Committed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Committed,
    Failed,
    Cancelled,
}

/// Rows and chunks committed for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: MirrorTable,
    pub rows: u64,
    pub chunks: u64,
}

/// Summary of one cycle. `tables` lists only the tables that were committed.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub outcome: SyncOutcome,
    pub tables: Vec<TableReport>,
    pub total_rows: u64,
    /// Table being loaded when the cycle failed.
    pub failed_table: Option<MirrorTable>,
    pub error: Option<String>,
}

impl SyncReport {
    pub fn rows_for(&self, table: MirrorTable) -> Option<u64> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }
}

/// Observable status, published on every transition.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    #[serde(flatten)]
    pub state: SyncState,
    pub running: bool,
    pub last_report: Option<SyncReport>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives sync cycles from a [`MirrorSource`] into a [`MirrorStore`].
///
/// At most one cycle runs at a time; see [`SyncOrchestrator::trigger`].
pub struct SyncOrchestrator {
    source: Arc<dyn MirrorSource>,
    store: Arc<dyn MirrorStore>,
    chunk_size: u64,
    running: Mutex<()>,
    status: watch::Sender<SyncStatus>,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn MirrorSource>,
        store: Arc<dyn MirrorStore>,
        chunk_size: u64,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus {
            state: SyncState::Idle,
            running: false,
            last_report: None,
        });
        Self {
            source,
            store,
            chunk_size: chunk_size.max(1),
            running: Mutex::new(()),
            status,
        }
    }

    /// Receive every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Current status snapshot.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.status.borrow().running
    }

    /// Run a cycle unless one is already in progress.
    ///
    /// Returns `None` when the trigger was skipped because another cycle
    /// holds the guard.
    pub async fn trigger(
        &self,
        cancel: &CancellationToken,
    ) -> Option<Result<SyncReport, SyncError>> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!("Sync cycle already running, trigger skipped");
            return None;
        };
        Some(self.run_cycle(cancel).await)
    }

    /// Record a cycle that ended without producing a report, e.g. a panic
    /// observed by the task that spawned it.
    pub fn record_abort(&self, reason: &str) {
        let now = Utc::now();
        self.status.send_modify(|status| {
            status.state = SyncState::Failed;
            status.running = false;
            status.last_report = Some(SyncReport {
                started_at: now,
                finished_at: now,
                outcome: SyncOutcome::Failed,
                tables: Vec::new(),
                total_rows: 0,
                failed_table: None,
                error: Some(reason.to_string()),
            });
        });
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        self.status.send_modify(|status| status.running = true);
        tracing::info!(chunk_size = self.chunk_size, "Sync cycle started");

        let mut tables = Vec::with_capacity(MirrorTable::WRITE_ORDER.len());
        let result = self.execute(cancel, &mut tables).await;
        let total_rows = tables.iter().map(|t| t.rows).sum();

        let outcome = match &result {
            Ok(()) => SyncOutcome::Committed,
            Err(SyncError::Cancelled) => SyncOutcome::Cancelled,
            Err(_) => SyncOutcome::Failed,
        };
        let report = SyncReport {
            started_at,
            finished_at: Utc::now(),
            outcome,
            tables,
            total_rows,
            failed_table: result.as_ref().err().and_then(SyncError::table),
            error: result.as_ref().err().map(ToString::to_string),
        };
        let elapsed_ms = clock.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => {
                tracing::info!(total_rows, elapsed_ms, "Sync cycle committed");
                self.set_state(SyncState::Committed);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    table = report.failed_table.map(MirrorTable::name),
                    committed_rows = total_rows,
                    elapsed_ms,
                    "Sync cycle failed",
                );
                self.set_state(SyncState::Failed);
            }
        }

        let last = report.clone();
        self.status.send_modify(|status| {
            status.state = SyncState::Idle;
            status.running = false;
            status.last_report = Some(last);
        });

        result.map(|()| report)
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        tables: &mut Vec<TableReport>,
    ) -> Result<(), SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        self.set_state(SyncState::Connecting);
        self.source.connect().await.map_err(SyncError::Connection)?;

        self.set_state(SyncState::Clearing);
        self.store
            .clear_all(&MirrorTable::CLEAR_ORDER)
            .await
            .map_err(SyncError::Clear)?;
        tracing::info!("Mirrored tables cleared");

        for table in MirrorTable::WRITE_ORDER {
            self.set_state(SyncState::Syncing { table });
            tables.push(self.sync_table(table.spec(), cancel).await?);
        }
        Ok(())
    }

    async fn sync_table(
        &self,
        spec: &'static TableSpec,
        cancel: &CancellationToken,
    ) -> Result<TableReport, SyncError> {
        let table = spec.table;
        let chunk_size = spec.effective_chunk_size(self.chunk_size);
        tracing::info!(table = spec.name, chunk_size, "Table sync started");

        let mut load = self
            .store
            .begin_table(spec)
            .await
            .map_err(|source| SyncError::ChunkWrite {
                table,
                offset: 0,
                source,
            })?;

        let streamed = self
            .stream_table(spec, chunk_size, load.as_mut(), cancel)
            .await;
        let report = match streamed {
            Ok(report) => report,
            Err(e) => {
                if let Err(rollback) = load.rollback().await {
                    tracing::error!(table = spec.name, error = %rollback, "Rollback failed");
                }
                return Err(e);
            }
        };

        load.commit()
            .await
            .map_err(|source| SyncError::Commit { table, source })?;
        tracing::info!(
            table = spec.name,
            rows = report.rows,
            chunks = report.chunks,
            "Table sync committed",
        );
        Ok(report)
    }

    async fn stream_table(
        &self,
        spec: &'static TableSpec,
        chunk_size: u64,
        load: &mut dyn TableLoad,
        cancel: &CancellationToken,
    ) -> Result<TableReport, SyncError> {
        let table = spec.table;
        let mut offset = 0;
        let mut rows = 0;
        let mut chunks = 0;

        loop {
            if cancel.is_cancelled() {
                tracing::info!(table = spec.name, offset, "Sync cancelled at chunk boundary");
                return Err(SyncError::Cancelled);
            }

            let chunk = self
                .source
                .fetch_chunk(spec, chunk_size, offset)
                .await
                .map_err(|source| match source {
                    SourceError::Timeout(_) => SyncError::Timeout { table, offset },
                    source => SyncError::ChunkRead {
                        table,
                        offset,
                        source,
                    },
                })?;
            if chunk.is_empty() {
                break;
            }

            load.insert_chunk(&chunk)
                .await
                .map_err(|source| SyncError::ChunkWrite {
                    table,
                    offset,
                    source,
                })?;

            rows += chunk.len() as u64;
            chunks += 1;
            offset += chunk_size;
            tracing::debug!(table = spec.name, chunk = chunks, rows, "Chunk written");
        }

        Ok(TableReport {
            table,
            rows,
            chunks,
        })
    }

    fn set_state(&self, state: SyncState) {
        self.status.send_modify(|status| status.state = state);
    }
}
