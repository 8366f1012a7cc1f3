//! Repository for the `applications` table and its children (`defects`,
//! `application_logs`).

use clientdesk_core::application::StatusChange;
use clientdesk_core::types::{DbId, Timestamp};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::application::{
    Application, ApplicationDefect, ApplicationFilter, ApplicationLog, NewApplication,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, client_id, creator_name, agreement_number, application_type, comment, \
    status, responsible_person_id, source, created_at, due_date, completed_at, last_status_change";

/// Provides CRUD operations for applications.
pub struct ApplicationRepo;

impl ApplicationRepo {
    /// Insert an application with its defects and first history row in one
    /// transaction, returning the created row.
    pub async fn create(
        pool: &SqlitePool,
        input: &NewApplication,
    ) -> Result<Application, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO applications
                (client_id, creator_name, agreement_number, application_type, comment, status,
                 responsible_person_id, source, created_at, due_date, last_status_change)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $9)
             RETURNING {COLUMNS}"
        );
        let application = sqlx::query_as::<_, Application>(&query)
            .bind(input.client_id)
            .bind(&input.creator_name)
            .bind(&input.agreement_number)
            .bind(&input.application_type)
            .bind(&input.comment)
            .bind(input.status)
            .bind(input.responsible_person_id)
            .bind(&input.source)
            .bind(input.created_at)
            .bind(input.due_date)
            .fetch_one(&mut *tx)
            .await?;

        for defect in &input.defects {
            sqlx::query(
                "INSERT INTO defects (application_id, defect_type, description)
                 VALUES ($1, $2, $3)",
            )
            .bind(application.id)
            .bind(&defect.defect_type)
            .bind(&defect.description)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO application_logs (application_id, timestamp, action, comment, author_name)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(application.id)
        .bind(input.created_at)
        .bind(&input.log_action)
        .bind(&input.log_comment)
        .bind(&input.creator_name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(application)
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        id: DbId,
    ) -> Result<Option<Application>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM applications WHERE id = $1");
        sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Applications of one client, newest first.
    pub async fn list_for_client(
        pool: &SqlitePool,
        client_id: DbId,
    ) -> Result<Vec<Application>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM applications WHERE client_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Application>(&query)
            .bind(client_id)
            .fetch_all(pool)
            .await
    }

    /// Filtered, paginated list, newest first. Overdue filtering is evaluated
    /// against `now`.
    pub async fn list(
        pool: &SqlitePool,
        filter: &ApplicationFilter,
        now: Timestamp,
    ) -> Result<Vec<Application>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM applications WHERE 1 = 1"));

        if let Some(status) = &filter.status {
            builder.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(application_type) = &filter.application_type {
            builder
                .push(" AND application_type = ")
                .push_bind(application_type.clone());
        }
        if let Some(person_id) = filter.responsible_person_id {
            builder
                .push(" AND responsible_person_id = ")
                .push_bind(person_id);
        }
        match filter.overdue {
            Some(true) => {
                builder
                    .push(" AND completed_at IS NULL AND due_date IS NOT NULL AND due_date < ")
                    .push_bind(now);
            }
            Some(false) => {
                builder
                    .push(" AND (completed_at IS NOT NULL OR due_date IS NULL OR due_date >= ")
                    .push_bind(now)
                    .push(")");
            }
            None => {}
        }

        let (limit, offset) = filter.limit_offset();
        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        builder
            .build_query_as::<Application>()
            .fetch_all(pool)
            .await
    }

    /// Apply a validated status change and append its history row.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_status(
        pool: &SqlitePool,
        id: DbId,
        change: &StatusChange,
        comment: &str,
        author_name: Option<&str>,
    ) -> Result<Option<Application>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE applications SET
                status = $2,
                completed_at = $3,
                last_status_change = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .bind(change.to.label())
            .bind(change.completed_at)
            .bind(change.changed_at)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(application) = updated else {
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO application_logs (application_id, timestamp, action, comment, author_name)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(change.changed_at)
        .bind(&change.log_action)
        .bind(comment)
        .bind(author_name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(application))
    }

    /// Permanently delete an application. Defects and history rows cascade.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// History of an application, oldest first.
    pub async fn logs(
        pool: &SqlitePool,
        application_id: DbId,
    ) -> Result<Vec<ApplicationLog>, sqlx::Error> {
        sqlx::query_as::<_, ApplicationLog>(
            "SELECT id, application_id, timestamp, action, comment, author_name
             FROM application_logs WHERE application_id = $1 ORDER BY timestamp, id",
        )
        .bind(application_id)
        .fetch_all(pool)
        .await
    }

    pub async fn defects(
        pool: &SqlitePool,
        application_id: DbId,
    ) -> Result<Vec<ApplicationDefect>, sqlx::Error> {
        sqlx::query_as::<_, ApplicationDefect>(
            "SELECT id, application_id, defect_type, description
             FROM defects WHERE application_id = $1 ORDER BY id",
        )
        .bind(application_id)
        .fetch_all(pool)
        .await
    }
}
