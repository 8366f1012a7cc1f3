//! Repository for the `application_types` and `defect_types` reference tables.

use clientdesk_core::application::normalize_execution_days;
use clientdesk_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::application_type::{ApplicationType, CreateApplicationType, DefectType};

const COLUMNS: &str = "id, name, template_filename, has_defect_list, execution_days";

/// Provides CRUD operations for application and defect types.
pub struct ApplicationTypeRepo;

impl ApplicationTypeRepo {
    pub async fn find_by_name(
        pool: &SqlitePool,
        name: &str,
    ) -> Result<Option<ApplicationType>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM application_types WHERE name = $1");
        sqlx::query_as::<_, ApplicationType>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &SqlitePool) -> Result<Vec<ApplicationType>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM application_types ORDER BY name");
        sqlx::query_as::<_, ApplicationType>(&query)
            .fetch_all(pool)
            .await
    }

    /// Insert a new application type. Missing or non-positive
    /// `execution_days` fall back to the default period.
    pub async fn create(
        pool: &SqlitePool,
        input: &CreateApplicationType,
    ) -> Result<ApplicationType, sqlx::Error> {
        let query = format!(
            "INSERT INTO application_types (name, template_filename, has_defect_list, execution_days)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApplicationType>(&query)
            .bind(input.name.trim())
            .bind(&input.template_filename)
            .bind(input.has_defect_list)
            .bind(normalize_execution_days(input.execution_days))
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM application_types WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_defect_types(pool: &SqlitePool) -> Result<Vec<DefectType>, sqlx::Error> {
        sqlx::query_as::<_, DefectType>("SELECT id, name FROM defect_types ORDER BY name")
            .fetch_all(pool)
            .await
    }

    pub async fn create_defect_type(
        pool: &SqlitePool,
        name: &str,
    ) -> Result<DefectType, sqlx::Error> {
        sqlx::query_as::<_, DefectType>(
            "INSERT INTO defect_types (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name.trim())
        .fetch_one(pool)
        .await
    }

    pub async fn delete_defect_type(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM defect_types WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
