//! Cycle protocol tests against recording fakes.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use clientdesk_core::mirror::MirrorTable;
use clientdesk_sync::{SyncError, SyncOrchestrator, SyncOutcome, SyncState};
use common::{journal, store_ops, FakeSource, Op, RecordingStore};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use MirrorTable::{Contacts, Deals, Houses, Sells};

fn orchestrator(source: FakeSource, store: RecordingStore, chunk_size: u64) -> SyncOrchestrator {
    SyncOrchestrator::new(Arc::new(source), Arc::new(store), chunk_size)
}

fn full_source(journal: &common::Journal) -> FakeSource {
    FakeSource::new(journal)
        .with_rows(Houses, 2)
        .with_rows(Contacts, 3)
        .with_rows(Sells, 2)
        .with_rows(Deals, 3)
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clear_runs_child_to_parent_then_tables_load_parent_to_child() {
    let journal = journal();
    let sync = orchestrator(full_source(&journal), RecordingStore::new(&journal), 100);

    let report = sync
        .trigger(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.outcome, SyncOutcome::Committed);

    assert_eq!(
        store_ops(&journal),
        vec![
            Op::Clear(vec![Deals, Sells, Contacts, Houses]),
            Op::Begin(Houses),
            Op::Insert { table: Houses, rows: 2 },
            Op::Commit(Houses),
            Op::Begin(Contacts),
            Op::Insert { table: Contacts, rows: 3 },
            Op::Commit(Contacts),
            Op::Begin(Sells),
            Op::Insert { table: Sells, rows: 2 },
            Op::Commit(Sells),
            Op::Begin(Deals),
            Op::Insert { table: Deals, rows: 3 },
            Op::Commit(Deals),
        ]
    );
}

#[tokio::test]
async fn report_counts_rows_per_table_and_in_total() {
    let journal = journal();
    let sync = orchestrator(full_source(&journal), RecordingStore::new(&journal), 100);

    let report = sync
        .trigger(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.rows_for(Houses), Some(2));
    assert_eq!(report.rows_for(Contacts), Some(3));
    assert_eq!(report.rows_for(Sells), Some(2));
    assert_eq!(report.rows_for(Deals), Some(3));
    assert_eq!(report.total_rows, 10);
    assert!(report.error.is_none());

    let status = sync.status();
    assert_eq!(status.state, SyncState::Idle);
    assert!(!status.running);
    assert_eq!(status.last_report.unwrap().total_rows, 10);
}

// ---------------------------------------------------------------------------
// Chunking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rows_are_streamed_in_fixed_size_chunks() {
    let journal = journal();
    let source = FakeSource::new(&journal).with_rows(Houses, 250);
    let sync = orchestrator(source, RecordingStore::new(&journal), 100);

    let report = sync
        .trigger(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    let inserts: Vec<usize> = store_ops(&journal)
        .into_iter()
        .filter_map(|op| match op {
            Op::Insert { table: Houses, rows } => Some(rows),
            _ => None,
        })
        .collect();
    assert_eq!(inserts, vec![100, 100, 50]);

    let offsets: Vec<u64> = journal
        .lock()
        .unwrap()
        .iter()
        .filter_map(|op| match op {
            Op::Fetch { table: Houses, offset, limit } => {
                assert_eq!(*limit, 100);
                Some(*offset)
            }
            _ => None,
        })
        .collect();
    // The empty read at 300 ends the table.
    assert_eq!(offsets, vec![0, 100, 200, 300]);

    let houses = &report.tables[0];
    assert_eq!((houses.rows, houses.chunks), (250, 3));
}

#[tokio::test]
async fn empty_tables_are_still_committed() {
    let journal = journal();
    let sync = orchestrator(FakeSource::new(&journal), RecordingStore::new(&journal), 100);

    let report = sync
        .trigger(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.total_rows, 0);
    assert_eq!(report.tables.len(), 4);
    assert!(store_ops(&journal).contains(&Op::Commit(Deals)));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connection_failure_touches_nothing_local() {
    let journal = journal();
    let source = full_source(&journal).failing_connect();
    let sync = orchestrator(source, RecordingStore::new(&journal), 100);

    let result = sync.trigger(&CancellationToken::new()).await.unwrap();
    assert_matches!(result, Err(SyncError::Connection(_)));
    assert!(store_ops(&journal).is_empty());

    let report = sync.status().last_report.unwrap();
    assert_eq!(report.outcome, SyncOutcome::Failed);
    assert!(report.error.unwrap().contains("connect"));
}

#[tokio::test]
async fn clear_failure_aborts_before_any_load() {
    let journal = journal();
    let store = RecordingStore::new(&journal).failing_clear();
    let sync = orchestrator(full_source(&journal), store, 100);

    let result = sync.trigger(&CancellationToken::new()).await.unwrap();
    assert_matches!(result, Err(SyncError::Clear(_)));
    assert_eq!(
        store_ops(&journal),
        vec![Op::Clear(vec![Deals, Sells, Contacts, Houses])]
    );
}

#[tokio::test]
async fn deal_write_failure_keeps_earlier_tables_committed() {
    let journal = journal();
    let source = FakeSource::new(&journal)
        .with_rows(Houses, 2)
        .with_rows(Contacts, 3)
        .with_rows(Sells, 2)
        .with_rows(Deals, 5);
    let store = RecordingStore::new(&journal).failing_insert(Deals, 2);
    let committed = store.committed();
    let sync = orchestrator(source, store, 2);

    let result = sync.trigger(&CancellationToken::new()).await.unwrap();
    assert_matches!(
        result,
        Err(SyncError::ChunkWrite { table: Deals, offset: 2, .. })
    );

    let committed = committed.lock().unwrap().clone();
    assert_eq!(committed.get(&Houses), Some(&2));
    assert_eq!(committed.get(&Contacts), Some(&3));
    assert_eq!(committed.get(&Sells), Some(&2));
    assert_eq!(committed.get(&Deals), None);

    let ops = store_ops(&journal);
    assert!(ops.contains(&Op::Rollback(Deals)));
    assert!(!ops.contains(&Op::Commit(Deals)));

    let report = sync.status().last_report.unwrap();
    assert_eq!(report.outcome, SyncOutcome::Failed);
    assert_eq!(report.failed_table, Some(Deals));
    assert_eq!(report.tables.len(), 3);
    assert_eq!(report.total_rows, 7);
}

#[tokio::test]
async fn read_failure_rolls_back_the_active_table() {
    let journal = journal();
    let source = full_source(&journal).failing_read(Contacts, 0);
    let sync = orchestrator(source, RecordingStore::new(&journal), 100);

    let result = sync.trigger(&CancellationToken::new()).await.unwrap();
    assert_matches!(
        result,
        Err(SyncError::ChunkRead { table: Contacts, offset: 0, .. })
    );
    let ops = store_ops(&journal);
    assert!(ops.contains(&Op::Commit(Houses)));
    assert!(ops.contains(&Op::Rollback(Contacts)));
    assert!(!ops.contains(&Op::Begin(Sells)));
}

// ---------------------------------------------------------------------------
// Cancellation and single flight
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_stops_at_the_next_chunk_boundary() {
    let journal = journal();
    let cancel = CancellationToken::new();
    let source = FakeSource::new(&journal)
        .with_rows(Houses, 2)
        .with_rows(Contacts, 3)
        .with_rows(Sells, 4)
        .cancelling_after(Sells, 0, cancel.clone());
    let sync = orchestrator(source, RecordingStore::new(&journal), 2);

    let result = sync.trigger(&cancel).await.unwrap();
    assert_matches!(result, Err(SyncError::Cancelled));

    let ops = store_ops(&journal);
    // The chunk already read is written, then the table is abandoned.
    assert!(ops.contains(&Op::Insert { table: Sells, rows: 2 }));
    assert!(ops.contains(&Op::Rollback(Sells)));
    assert!(!ops.contains(&Op::Commit(Sells)));
    assert!(!ops.contains(&Op::Begin(Deals)));

    assert_eq!(
        sync.status().last_report.unwrap().outcome,
        SyncOutcome::Cancelled
    );
}

#[tokio::test]
async fn cancelled_token_prevents_the_cycle_from_starting() {
    let journal = journal();
    let sync = orchestrator(full_source(&journal), RecordingStore::new(&journal), 100);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = sync.trigger(&cancel).await.unwrap();
    assert_matches!(result, Err(SyncError::Cancelled));
    assert!(journal.lock().unwrap().is_empty());
}

#[tokio::test]
async fn overlapping_trigger_is_skipped() {
    let journal = journal();
    let gate = Arc::new(Notify::new());
    let source = full_source(&journal).gated(Arc::clone(&gate));
    let sync = Arc::new(orchestrator(source, RecordingStore::new(&journal), 100));

    let first = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.trigger(&CancellationToken::new()).await })
    };

    let mut status = sync.subscribe();
    status.wait_for(|s| s.running).await.unwrap();
    assert!(sync.is_running());

    assert!(sync.trigger(&CancellationToken::new()).await.is_none());

    gate.notify_one();
    let report = first.await.unwrap().unwrap().unwrap();
    assert_eq!(report.outcome, SyncOutcome::Committed);
    assert_eq!(
        journal
            .lock()
            .unwrap()
            .iter()
            .filter(|op| **op == Op::Connect)
            .count(),
        1
    );
}

// ---------------------------------------------------------------------------
// Detached cycles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn panicking_cycle_is_recorded_and_contained() {
    let journal = journal();
    let source = full_source(&journal).panicking_on(Sells);
    let sync = Arc::new(orchestrator(source, RecordingStore::new(&journal), 100));

    clientdesk_sync::run_detached(&sync, &CancellationToken::new()).await;

    let status = sync.status();
    assert_eq!(status.state, SyncState::Failed);
    assert!(!status.running);
    assert!(!sync.is_running());
    let report = status.last_report.unwrap();
    assert_eq!(report.outcome, SyncOutcome::Failed);
    assert!(report.error.unwrap().contains("aborted"));
    assert!(!store_ops(&journal).contains(&Op::Commit(Sells)));
}
