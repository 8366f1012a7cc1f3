//! Repository for the `email_logs` table.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::email_log::{CreateEmailLog, EmailLog};

const COLUMNS: &str = "id, application_id, timestamp, recipient, subject, status, server_response";

/// Records notification delivery attempts.
pub struct EmailLogRepo;

impl EmailLogRepo {
    pub async fn create(pool: &SqlitePool, input: &CreateEmailLog) -> Result<EmailLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO email_logs (application_id, timestamp, recipient, subject, status, server_response)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmailLog>(&query)
            .bind(input.application_id)
            .bind(Utc::now())
            .bind(&input.recipient)
            .bind(&input.subject)
            .bind(input.status)
            .bind(&input.server_response)
            .fetch_one(pool)
            .await
    }

    /// Most recent attempts first.
    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<EmailLog>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM email_logs ORDER BY timestamp DESC, id DESC LIMIT $1");
        sqlx::query_as::<_, EmailLog>(&query)
            .bind(limit.clamp(1, 1000))
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_application(
        pool: &SqlitePool,
        application_id: i64,
    ) -> Result<Vec<EmailLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_logs WHERE application_id = $1 ORDER BY timestamp, id"
        );
        sqlx::query_as::<_, EmailLog>(&query)
            .bind(application_id)
            .fetch_all(pool)
            .await
    }
}
