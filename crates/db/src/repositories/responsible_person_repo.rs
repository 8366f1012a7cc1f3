//! Repository for `responsible_persons` and their house assignments.

use clientdesk_core::types::DbId;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::models::responsible_person::{
    CreateResponsiblePerson, ResponsiblePerson, UpdateResponsiblePerson,
};

const COLUMNS: &str = "id, full_name, email, application_types_json";

/// Provides CRUD operations and routing lookups for responsible persons.
pub struct ResponsiblePersonRepo;

impl ResponsiblePersonRepo {
    pub async fn find_by_id(
        pool: &SqlitePool,
        id: DbId,
    ) -> Result<Option<ResponsiblePerson>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM responsible_persons WHERE id = $1");
        sqlx::query_as::<_, ResponsiblePerson>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &SqlitePool) -> Result<Vec<ResponsiblePerson>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM responsible_persons ORDER BY full_name, id");
        sqlx::query_as::<_, ResponsiblePerson>(&query)
            .fetch_all(pool)
            .await
    }

    /// Insert a person together with their house assignments.
    pub async fn create(
        pool: &SqlitePool,
        input: &CreateResponsiblePerson,
    ) -> Result<ResponsiblePerson, sqlx::Error> {
        let types_json = serde_json::to_string(&input.application_types)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO responsible_persons (full_name, email, application_types_json)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let person = sqlx::query_as::<_, ResponsiblePerson>(&query)
            .bind(input.full_name.trim())
            .bind(input.email.trim())
            .bind(&types_json)
            .fetch_one(&mut *tx)
            .await?;

        Self::insert_assignments(&mut tx, person.id, &input.house_ids).await?;

        tx.commit().await?;
        Ok(person)
    }

    /// Update a person. `house_ids` replaces every assignment when given.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &SqlitePool,
        id: DbId,
        input: &UpdateResponsiblePerson,
        house_ids: Option<&[DbId]>,
    ) -> Result<Option<ResponsiblePerson>, sqlx::Error> {
        let types_json = input
            .application_types
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE responsible_persons SET
                full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                application_types_json = COALESCE($4, application_types_json)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, ResponsiblePerson>(&query)
            .bind(id)
            .bind(input.full_name.as_deref().map(str::trim))
            .bind(input.email.as_deref().map(str::trim))
            .bind(types_json)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(person) = updated else {
            return Ok(None);
        };

        if let Some(house_ids) = house_ids {
            sqlx::query("DELETE FROM responsible_assignments WHERE responsible_person_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::insert_assignments(&mut tx, id, house_ids).await?;
        }

        tx.commit().await?;
        Ok(Some(person))
    }

    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM responsible_persons WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// House ids assigned to a person.
    pub async fn house_ids(pool: &SqlitePool, person_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT house_id FROM responsible_assignments
             WHERE responsible_person_id = $1 ORDER BY house_id",
        )
        .bind(person_id)
        .fetch_all(pool)
        .await
    }

    /// Distinct complex names of the houses assigned to a person.
    pub async fn complex_names(
        pool: &SqlitePool,
        person_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT h.complex_name
             FROM responsible_assignments ra
             JOIN estate_houses h ON h.house_id = ra.house_id
             WHERE ra.responsible_person_id = $1 AND h.complex_name IS NOT NULL
             ORDER BY h.complex_name",
        )
        .bind(person_id)
        .fetch_all(pool)
        .await
    }

    /// Persons assigned to `house_id` who handle `application_type`.
    ///
    /// The type match is evaluated on the decoded JSON list, not with a
    /// substring search, so "Дефекты" never matches "Дефекты МОП".
    pub async fn for_house_and_type(
        pool: &SqlitePool,
        house_id: DbId,
        application_type: &str,
    ) -> Result<Vec<ResponsiblePerson>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM responsible_persons
             WHERE id IN (SELECT responsible_person_id FROM responsible_assignments WHERE house_id = $1)
             ORDER BY full_name, id"
        );
        let persons = sqlx::query_as::<_, ResponsiblePerson>(&query)
            .bind(house_id)
            .fetch_all(pool)
            .await?;

        Ok(persons
            .into_iter()
            .filter(|p| p.handles(application_type))
            .collect())
    }

    /// Persons assigned to any house of `complex_name` who handle
    /// `application_type`.
    pub async fn for_complex_and_type(
        pool: &SqlitePool,
        complex_name: &str,
        application_type: &str,
    ) -> Result<Vec<ResponsiblePerson>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM responsible_persons
             WHERE id IN (
                SELECT ra.responsible_person_id FROM responsible_assignments ra
                JOIN estate_houses h ON h.house_id = ra.house_id
                WHERE h.complex_name = $1)
             ORDER BY full_name, id"
        );
        let persons = sqlx::query_as::<_, ResponsiblePerson>(&query)
            .bind(complex_name)
            .fetch_all(pool)
            .await?;

        Ok(persons
            .into_iter()
            .filter(|p| p.handles(application_type))
            .collect())
    }

    async fn insert_assignments(
        tx: &mut Transaction<'_, Sqlite>,
        person_id: DbId,
        house_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        for house_id in house_ids {
            sqlx::query(
                "INSERT INTO responsible_assignments (responsible_person_id, house_id)
                 VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(person_id)
            .bind(house_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}
