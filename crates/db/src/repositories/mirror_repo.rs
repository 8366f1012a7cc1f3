//! Bulk write path for the mirrored tables.
//!
//! Only the sync engine calls into this repository. It provides the two
//! transactional primitives of a sync cycle: the atomic clear of every
//! mirrored table, and chunked bulk inserts inside a per-table transaction
//! that the caller commits once the table is fully streamed.

use clientdesk_core::mirror::{check_row, MirrorTable, MirrorValue, TableSpec};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER` is 32766; stay below it.
const MAX_BIND_PARAMS: usize = 30_000;

/// Error type for the mirror write path.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row did not match the table descriptor.
    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

/// Local-only stash table for a table with preserved columns.
fn stash_table(table: MirrorTable) -> Option<&'static str> {
    match table {
        MirrorTable::Houses => Some("house_warranty_stash"),
        _ => None,
    }
}

/// Provides the clear and bulk-insert primitives of a sync cycle.
pub struct MirrorRepo;

impl MirrorRepo {
    /// Delete every row of `tables`, in the given order, in one transaction.
    ///
    /// Foreign-key checks are deferred to commit for the duration of the
    /// transaction (`PRAGMA foreign_keys` cannot change inside one), and
    /// preserved columns are stashed before their table is emptied. On any
    /// error the transaction is dropped, which rolls it back: either every
    /// table is cleared or none is.
    pub async fn clear_all(pool: &SqlitePool, tables: &[MirrorTable]) -> Result<(), MirrorError> {
        let mut tx = pool.begin().await?;

        sqlx::query("PRAGMA defer_foreign_keys = ON")
            .execute(&mut *tx)
            .await?;

        for &table in tables {
            let spec = table.spec();
            Self::stash_preserved(&mut tx, spec).await?;

            let query = format!("DELETE FROM {}", spec.name);
            let deleted = sqlx::query(&query)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            tracing::debug!(table = spec.name, deleted, "Mirror table cleared");
        }

        tx.commit().await?;
        Ok(())
    }

    /// Start the transaction a table is loaded in.
    pub async fn begin_load(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, MirrorError> {
        Ok(pool.begin().await?)
    }

    /// Append `rows` to the table inside `tx` using multi-row `INSERT`s.
    ///
    /// Every row is checked against the descriptor before anything is sent.
    /// Returns the number of rows inserted.
    pub async fn insert_chunk(
        tx: &mut Transaction<'static, Sqlite>,
        spec: &TableSpec,
        rows: &[Vec<MirrorValue>],
    ) -> Result<u64, MirrorError> {
        for row in rows {
            check_row(spec, row).map_err(MirrorError::MalformedRow)?;
        }

        let rows_per_statement = (MAX_BIND_PARAMS / spec.columns.len()).max(1);
        let mut inserted = 0;

        for batch in rows.chunks(rows_per_statement) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "INSERT INTO {} ({}) ",
                spec.name,
                spec.column_list()
            ));
            builder.push_values(batch, |mut values, row| {
                for value in row {
                    match value {
                        MirrorValue::Null => values.push_bind(None::<i64>),
                        MirrorValue::Integer(v) => values.push_bind(*v),
                        MirrorValue::Real(v) => values.push_bind(*v),
                        MirrorValue::Text(v) => values.push_bind(v.clone()),
                        MirrorValue::Date(v) => values.push_bind(*v),
                    };
                }
            });
            inserted += builder.build().execute(&mut **tx).await?.rows_affected();
        }

        Ok(inserted)
    }

    /// Finish a table load before commit: copy stashed preserved columns back
    /// onto rows whose key reappeared.
    pub async fn restore_preserved(
        tx: &mut Transaction<'static, Sqlite>,
        spec: &TableSpec,
    ) -> Result<u64, MirrorError> {
        let Some(stash) = stash_table(spec.table) else {
            return Ok(0);
        };
        if spec.preserved_columns.is_empty() {
            return Ok(0);
        }

        let assignments = spec
            .preserved_columns
            .iter()
            .map(|col| {
                format!(
                    "{col} = (SELECT s.{col} FROM {stash} s WHERE s.{key} = {table}.{key})",
                    key = spec.key,
                    table = spec.name
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "UPDATE {table} SET {assignments} WHERE {key} IN (SELECT {key} FROM {stash})",
            table = spec.name,
            key = spec.key
        );

        let restored = sqlx::query(&query).execute(&mut **tx).await?.rows_affected();
        if restored > 0 {
            tracing::debug!(table = spec.name, restored, "Preserved columns restored");
        }
        Ok(restored)
    }

    /// Row count of a mirrored table.
    pub async fn count(pool: &SqlitePool, table: MirrorTable) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {}", table.name());
        sqlx::query_scalar(&query).fetch_one(pool).await
    }

    /// Upsert the non-null preserved columns of `spec`'s current rows into
    /// its stash. Stashed values are only overwritten by non-null ones.
    async fn stash_preserved(
        tx: &mut Transaction<'static, Sqlite>,
        spec: &TableSpec,
    ) -> Result<(), MirrorError> {
        let Some(stash) = stash_table(spec.table) else {
            return Ok(());
        };
        if spec.preserved_columns.is_empty() {
            return Ok(());
        }

        let columns = spec.preserved_columns.join(", ");
        let any_set = spec
            .preserved_columns
            .iter()
            .map(|col| format!("{col} IS NOT NULL"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let updates = spec
            .preserved_columns
            .iter()
            .map(|col| format!("{col} = COALESCE(excluded.{col}, {stash}.{col})"))
            .collect::<Vec<_>>()
            .join(", ");

        // The WHERE clause also disambiguates INSERT ... SELECT ... ON CONFLICT
        // for SQLite's parser.
        let query = format!(
            "INSERT INTO {stash} ({key}, {columns}) \
             SELECT {key}, {columns} FROM {table} WHERE {any_set} \
             ON CONFLICT ({key}) DO UPDATE SET {updates}",
            key = spec.key,
            table = spec.name
        );
        sqlx::query(&query).execute(&mut **tx).await?;
        Ok(())
    }
}
