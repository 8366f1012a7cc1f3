//! Shared fixtures for sync engine tests.
//!
//! - [`FakeSource`] / [`RecordingStore`]: in-memory source and store that log
//!   every operation into one shared journal and inject failures on demand.
//! - [`SqliteSource`]: a real SQL source backed by an in-memory SQLite
//!   database standing in for the remote MySQL server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clientdesk_core::mirror::{MirrorRow, MirrorTable, MirrorValue, TableSpec};
use clientdesk_sync::source::{chunk_query, decode_row, Dialect};
use clientdesk_sync::{MirrorSource, MirrorStore, SourceError, StoreError, TableLoad};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Connect,
    Fetch { table: MirrorTable, offset: u64, limit: u64 },
    Clear(Vec<MirrorTable>),
    Begin(MirrorTable),
    Insert { table: MirrorTable, rows: usize },
    Commit(MirrorTable),
    Rollback(MirrorTable),
}

pub type Journal = Arc<Mutex<Vec<Op>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(journal: &Journal, op: Op) {
    journal.lock().unwrap().push(op);
}

/// Store-side operations only, in order.
pub fn store_ops(journal: &Journal) -> Vec<Op> {
    journal
        .lock()
        .unwrap()
        .iter()
        .filter(|op| !matches!(op, Op::Connect | Op::Fetch { .. }))
        .cloned()
        .collect()
}

/// Synthetic rows; the recording store does not look inside them.
pub fn rows(count: usize) -> Vec<MirrorRow> {
    (1..=count as i64)
        .map(|id| vec![MirrorValue::Integer(id)])
        .collect()
}

// ---------------------------------------------------------------------------
// FakeSource
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSource {
    journal: Journal,
    tables: HashMap<MirrorTable, Vec<MirrorRow>>,
    fail_connect: bool,
    fail_read: Option<(MirrorTable, u64)>,
    panic_on: Option<MirrorTable>,
    cancel_after: Option<(MirrorTable, u64, CancellationToken)>,
    gate: Option<Arc<Notify>>,
}

impl FakeSource {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Arc::clone(journal),
            ..Default::default()
        }
    }

    pub fn with_rows(mut self, table: MirrorTable, count: usize) -> Self {
        self.tables.insert(table, rows(count));
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn failing_read(mut self, table: MirrorTable, offset: u64) -> Self {
        self.fail_read = Some((table, offset));
        self
    }

    /// Panic on the first read of `table`.
    pub fn panicking_on(mut self, table: MirrorTable) -> Self {
        self.panic_on = Some(table);
        self
    }

    /// Cancel `token` right after serving the chunk of `table` at `offset`.
    pub fn cancelling_after(
        mut self,
        table: MirrorTable,
        offset: u64,
        token: CancellationToken,
    ) -> Self {
        self.cancel_after = Some((table, offset, token));
        self
    }

    /// Block `connect` until the gate is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl MirrorSource for FakeSource {
    async fn connect(&self) -> Result<(), SourceError> {
        record(&self.journal, Op::Connect);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_connect {
            return Err(SourceError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn fetch_chunk(
        &self,
        spec: &'static TableSpec,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<MirrorRow>, SourceError> {
        record(
            &self.journal,
            Op::Fetch {
                table: spec.table,
                offset,
                limit,
            },
        );
        if self.fail_read == Some((spec.table, offset)) {
            return Err(SourceError::Database(sqlx::Error::Protocol(
                "injected read failure".into(),
            )));
        }
        if self.panic_on == Some(spec.table) {
            panic!("driver crashed while reading {}", spec.name);
        }

        let all = self.tables.get(&spec.table).map(Vec::as_slice).unwrap_or(&[]);
        let chunk = all
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        if let Some((table, at, token)) = &self.cancel_after {
            if *table == spec.table && *at == offset {
                token.cancel();
            }
        }
        Ok(chunk)
    }
}

// ---------------------------------------------------------------------------
// RecordingStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingStore {
    journal: Journal,
    committed: Arc<Mutex<HashMap<MirrorTable, usize>>>,
    fail_clear: bool,
    /// `(table, n)`: the n-th chunk (1-based) of `table` fails to insert.
    fail_insert: Option<(MirrorTable, usize)>,
}

impl RecordingStore {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Arc::clone(journal),
            ..Default::default()
        }
    }

    pub fn failing_clear(mut self) -> Self {
        self.fail_clear = true;
        self
    }

    pub fn failing_insert(mut self, table: MirrorTable, chunk: usize) -> Self {
        self.fail_insert = Some((table, chunk));
        self
    }

    /// Rows committed per table, as a handle that outlives the store.
    pub fn committed(&self) -> Arc<Mutex<HashMap<MirrorTable, usize>>> {
        Arc::clone(&self.committed)
    }
}

#[async_trait]
impl MirrorStore for RecordingStore {
    async fn clear_all(&self, tables: &[MirrorTable]) -> Result<(), StoreError> {
        record(&self.journal, Op::Clear(tables.to_vec()));
        if self.fail_clear {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "injected clear failure".into(),
            )));
        }
        self.committed.lock().unwrap().clear();
        Ok(())
    }

    async fn begin_table(&self, spec: &'static TableSpec) -> Result<Box<dyn TableLoad>, StoreError> {
        record(&self.journal, Op::Begin(spec.table));
        Ok(Box::new(RecordingLoad {
            journal: Arc::clone(&self.journal),
            committed: Arc::clone(&self.committed),
            table: spec.table,
            buffered: 0,
            chunks: 0,
            fail_at: self
                .fail_insert
                .filter(|(table, _)| *table == spec.table)
                .map(|(_, chunk)| chunk),
        }))
    }
}

struct RecordingLoad {
    journal: Journal,
    committed: Arc<Mutex<HashMap<MirrorTable, usize>>>,
    table: MirrorTable,
    buffered: usize,
    chunks: usize,
    fail_at: Option<usize>,
}

#[async_trait]
impl TableLoad for RecordingLoad {
    async fn insert_chunk(&mut self, rows: &[MirrorRow]) -> Result<u64, StoreError> {
        self.chunks += 1;
        if self.fail_at == Some(self.chunks) {
            return Err(StoreError::MalformedRow("injected write failure".into()));
        }
        record(
            &self.journal,
            Op::Insert {
                table: self.table,
                rows: rows.len(),
            },
        );
        self.buffered += rows.len();
        Ok(rows.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        record(&self.journal, Op::Commit(self.table));
        self.committed
            .lock()
            .unwrap()
            .insert(self.table, self.buffered);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        record(&self.journal, Op::Rollback(self.table));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SqliteSource
// ---------------------------------------------------------------------------

/// Remote schema: the mirrored tables without foreign keys, so orphans can
/// exist at the source the way they do in production.
const REMOTE_SCHEMA: &[&str] = &[
    "CREATE TABLE estate_houses (
        house_id INTEGER PRIMARY KEY, complex_name TEXT, name TEXT,
        warranty_house_end_date DATE, warranty_apartments_end_date DATE)",
    "CREATE TABLE estate_deals_contacts (
        id INTEGER PRIMARY KEY, contacts_buy_name TEXT, contacts_buy_phones TEXT)",
    "CREATE TABLE estate_sells (
        estate_sell_id INTEGER PRIMARY KEY, estate_sell_category TEXT, house_id INTEGER,
        estate_rooms INTEGER, geo_house_entrance TEXT, estate_floor INTEGER,
        estate_riser TEXT, geo_flatnum TEXT)",
    "CREATE TABLE estate_deals (
        id INTEGER PRIMARY KEY, estate_sell_id INTEGER, deal_status_name TEXT,
        agreement_number TEXT, agreement_date DATE, deal_sum REAL, deal_area REAL,
        contacts_buy_id INTEGER, finances_income_reserved REAL)",
];

pub struct SqliteSource {
    pub pool: SqlitePool,
}

impl SqliteSource {
    /// A fresh, empty in-memory remote.
    pub async fn new() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for statement in REMOTE_SCHEMA {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        Self { pool }
    }

    pub async fn exec(&self, sql: &str) {
        sqlx::query(sql).execute(&self.pool).await.unwrap();
    }

    /// 2 houses, 3 contacts, 2 sells and 4 deals, one of which references a
    /// contact that does not exist.
    pub async fn seed_standard(&self) {
        self.exec(
            "INSERT INTO estate_houses (house_id, complex_name, name, warranty_house_end_date)
             VALUES (1, 'ЖК Сад', 'Дом 1', '2001-01-01'), (2, 'ЖК Сад', 'Дом 2', NULL)",
        )
        .await;
        self.exec(
            "INSERT INTO estate_deals_contacts VALUES
                (10, 'Иванов', '+998 90 000 00 10'),
                (11, 'Петров', '+998 90 000 00 11'),
                (12, 'Сидоров', NULL)",
        )
        .await;
        self.exec(
            "INSERT INTO estate_sells VALUES
                (100, 'flat', 1, 2, '1', 3, 'A', '12'),
                (101, 'flat', 2, 1, '2', 7, 'B', '44')",
        )
        .await;
        self.exec(
            "INSERT INTO estate_deals VALUES
                (1000, 100, 'Сделка проведена', 'A-1', '2024-05-20', 125000.0, 64.5, 10, NULL),
                (1001, 101, 'Сделка проведена', 'A-2', '2024-06-01', 98000.0, 41.0, 11, 5000.0),
                (1002, 100, 'Бронь', 'A-3', NULL, NULL, NULL, 12, NULL),
                (1003, 101, 'Сделка проведена', 'A-4', '2024-07-15', 77000.0, 38.2, 99, NULL)",
        )
        .await;
    }
}

#[async_trait]
impl MirrorSource for SqliteSource {
    async fn connect(&self) -> Result<(), SourceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_chunk(
        &self,
        spec: &'static TableSpec,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<MirrorRow>, SourceError> {
        let query = chunk_query(spec, Dialect::Sqlite);
        let rows = sqlx::query(&query)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| decode_row(row, spec))
            .collect::<Result<_, _>>()?)
    }
}
