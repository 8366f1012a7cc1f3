//! Repository for the mirrored `estate_houses` table.
//!
//! Houses are written by the sync engine; the only local write is the
//! warranty deadline upload.

use chrono::NaiveDate;
use clientdesk_core::types::DbId;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::house::House;

const COLUMNS: &str =
    "house_id, complex_name, name, warranty_house_end_date, warranty_apartments_end_date";

/// Provides read access and warranty updates for houses.
pub struct HouseRepo;

impl HouseRepo {
    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<House>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM estate_houses WHERE house_id = $1");
        sqlx::query_as::<_, House>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// First house with the given name. House names are unique in practice
    /// but the source does not guarantee it.
    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<House>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM estate_houses WHERE name = $1 ORDER BY house_id LIMIT 1"
        );
        sqlx::query_as::<_, House>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// All houses ordered by complex, then name.
    pub async fn list(pool: &SqlitePool) -> Result<Vec<House>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM estate_houses ORDER BY complex_name, name, house_id");
        sqlx::query_as::<_, House>(&query).fetch_all(pool).await
    }

    /// Ids of every house belonging to one of `complex_names`.
    pub async fn ids_in_complexes(
        pool: &SqlitePool,
        complex_names: &[String],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        if complex_names.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT house_id FROM estate_houses WHERE complex_name IN (");
        let mut names = builder.separated(", ");
        for name in complex_names {
            names.push_bind(name.trim().to_string());
        }
        builder.push(") ORDER BY house_id");
        builder.build_query_scalar().fetch_all(pool).await
    }

    /// Set warranty end dates on a house. `None` leaves a date unchanged.
    ///
    /// The stash used by the sync engine is updated in the same transaction
    /// so the next reload keeps the new values. Returns `false` when the
    /// house does not exist.
    pub async fn set_warranty(
        pool: &SqlitePool,
        house_id: DbId,
        house_date: Option<NaiveDate>,
        apartments_date: Option<NaiveDate>,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE estate_houses SET
                warranty_house_end_date = COALESCE($2, warranty_house_end_date),
                warranty_apartments_end_date = COALESCE($3, warranty_apartments_end_date)
             WHERE house_id = $1",
        )
        .bind(house_id)
        .bind(house_date)
        .bind(apartments_date)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO house_warranty_stash
                (house_id, warranty_house_end_date, warranty_apartments_end_date)
             SELECT house_id, warranty_house_end_date, warranty_apartments_end_date
             FROM estate_houses WHERE house_id = $1
             ON CONFLICT (house_id) DO UPDATE SET
                warranty_house_end_date = excluded.warranty_house_end_date,
                warranty_apartments_end_date = excluded.warranty_apartments_end_date",
        )
        .bind(house_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
