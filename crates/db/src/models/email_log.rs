//! Notification email log model.

use clientdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

pub const EMAIL_STATUS_SUCCESS: &str = "Success";
pub const EMAIL_STATUS_SKIPPED: &str = "Skipped";
pub const EMAIL_STATUS_FAILED: &str = "Failed";

/// A row from `email_logs`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmailLog {
    pub id: DbId,
    pub application_id: Option<DbId>,
    pub timestamp: Timestamp,
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub status: String,
    pub server_response: Option<String>,
}

/// DTO for recording a delivery attempt.
#[derive(Debug, Clone)]
pub struct CreateEmailLog {
    pub application_id: Option<DbId>,
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub status: &'static str,
    pub server_response: Option<String>,
}
