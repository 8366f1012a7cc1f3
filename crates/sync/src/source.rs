//! Remote data source adapter.
//!
//! Reads one mirrored table at a time in ordered `LIMIT`/`OFFSET` pages. Rows
//! whose parent links do not resolve at the source are filtered out by the
//! query itself, so orphans never leave the remote database.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use clientdesk_core::mirror::{ColumnKind, MirrorRow, MirrorValue, TableSpec};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{ColumnIndex, Decode, Row, Type};

use crate::config::SourceConfig;
use crate::error::{SourceError, SyncError};

/// Paged reader over the remote copies of the mirrored tables.
#[async_trait]
pub trait MirrorSource: Send + Sync {
    /// Verify the source is reachable. Called once per cycle, before any
    /// local change.
    async fn connect(&self) -> Result<(), SourceError>;

    /// Up to `limit` rows of `spec`'s table starting at `offset`, ordered by
    /// primary key. An empty result means the table is exhausted.
    async fn fetch_chunk(
        &self,
        spec: &'static TableSpec,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<MirrorRow>, SourceError>;
}

// ---------------------------------------------------------------------------
// Query construction
// ---------------------------------------------------------------------------

/// SQL flavour of a chunk query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Columns are cast so every value decodes to its descriptor kind.
    MySql,
    /// Plain column references.
    Sqlite,
}

fn select_expr(alias: &str, name: &str, kind: ColumnKind, dialect: Dialect) -> String {
    match dialect {
        Dialect::Sqlite => format!("{alias}.{name}"),
        Dialect::MySql => {
            let target = match kind {
                ColumnKind::Integer => "SIGNED",
                ColumnKind::Real => "DOUBLE",
                ColumnKind::Text => "CHAR",
                ColumnKind::Date => "DATE",
            };
            format!("CAST({alias}.{name} AS {target}) AS {name}")
        }
    }
}

/// Conditions under which the row aliased `alias` has every parent.
///
/// Parents are checked with `EXISTS` semi-joins, which never multiply rows.
/// The parent's own links are applied recursively: a deal whose sell is
/// itself filtered out is filtered out too.
fn parent_conditions(spec: &TableSpec, alias: &str) -> Vec<String> {
    spec.parents
        .iter()
        .enumerate()
        .map(|(i, link)| {
            let parent = link.parent.spec();
            let parent_alias = format!("{alias}_{i}");
            let mut checks = vec![format!(
                "{parent_alias}.{key} = {alias}.{column}",
                key = parent.key,
                column = link.column
            )];
            checks.extend(parent_conditions(parent, &parent_alias));

            let exists = format!(
                "EXISTS (SELECT 1 FROM {table} {parent_alias} WHERE {checks})",
                table = parent.name,
                checks = checks.join(" AND ")
            );
            if link.required {
                exists
            } else {
                format!("({alias}.{column} IS NULL OR {exists})", column = link.column)
            }
        })
        .collect()
}

/// The paged `SELECT` for one table. Binds `LIMIT` then `OFFSET`.
pub fn chunk_query(spec: &TableSpec, dialect: Dialect) -> String {
    let alias = "t";
    let columns = spec
        .columns
        .iter()
        .map(|c| select_expr(alias, c.name, c.kind, dialect))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("SELECT {columns} FROM {} {alias}", spec.name);
    let conditions = parent_conditions(spec, alias);
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(&format!(" ORDER BY {alias}.{} LIMIT ? OFFSET ?", spec.key));
    sql
}

/// Decode one result row into descriptor order.
pub fn decode_row<R>(row: &R, spec: &TableSpec) -> Result<MirrorRow, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
{
    spec.columns
        .iter()
        .enumerate()
        .map(|(i, column)| -> Result<MirrorValue, sqlx::Error> {
            let value = match column.kind {
                ColumnKind::Integer => row
                    .try_get::<Option<i64>, _>(i)?
                    .map(MirrorValue::Integer),
                ColumnKind::Real => row.try_get::<Option<f64>, _>(i)?.map(MirrorValue::Real),
                ColumnKind::Text => row
                    .try_get::<Option<String>, _>(i)?
                    .map(MirrorValue::Text),
                ColumnKind::Date => row
                    .try_get::<Option<NaiveDate>, _>(i)?
                    .map(MirrorValue::Date),
            };
            Ok(value.unwrap_or(MirrorValue::Null))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// MySQL
// ---------------------------------------------------------------------------

/// Read-only adapter over the remote MySQL database.
///
/// The pool connects lazily; [`MirrorSource::connect`] forces the first
/// connection so an unreachable source fails the cycle before anything
/// local is cleared.
pub struct MySqlSource {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlSource {
    pub fn new(config: &SourceConfig, timeout: Duration) -> Result<Self, SyncError> {
        let options = config.connect_options()?;
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(timeout)
            .connect_lazy_with(options);
        Ok(Self { pool, timeout })
    }

    async fn bounded<T, F>(&self, query: F) -> Result<T, SourceError>
    where
        F: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, query).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SourceError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl MirrorSource for MySqlSource {
    async fn connect(&self) -> Result<(), SourceError> {
        self.bounded(sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map(|_| ())
    }

    async fn fetch_chunk(
        &self,
        spec: &'static TableSpec,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<MirrorRow>, SourceError> {
        let query = chunk_query(spec, Dialect::MySql);
        let rows = self
            .bounded(
                sqlx::query(&query)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool),
            )
            .await?;

        rows.iter()
            .map(|row| decode_row(row, spec).map_err(SourceError::from))
            .collect()
    }
}
