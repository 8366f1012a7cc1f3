//! Application (service request) model and DTOs.

use clientdesk_core::application::Defect;
use clientdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `applications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Application {
    pub id: DbId,
    pub client_id: DbId,
    pub creator_name: Option<String>,
    pub agreement_number: String,
    pub application_type: String,
    pub comment: String,
    pub status: String,
    pub responsible_person_id: Option<DbId>,
    pub source: String,
    pub created_at: Timestamp,
    pub due_date: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub last_status_change: Timestamp,
}

impl Application {
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        clientdesk_core::application::is_overdue(self.due_date, self.completed_at, now)
    }
}

/// A fully validated application ready to insert.
///
/// Built by the lifecycle layer after status, deadline, source and defect
/// rules have been applied.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub client_id: DbId,
    pub creator_name: Option<String>,
    pub agreement_number: String,
    pub application_type: String,
    pub comment: String,
    pub status: &'static str,
    pub responsible_person_id: DbId,
    pub source: String,
    pub created_at: Timestamp,
    pub due_date: Option<Timestamp>,
    pub defects: Vec<Defect>,
    /// History entry written with the application.
    pub log_action: String,
    pub log_comment: Option<String>,
}

/// A row from `defects`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApplicationDefect {
    pub id: DbId,
    pub application_id: DbId,
    pub defect_type: String,
    pub description: String,
}

/// A row from `application_logs`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApplicationLog {
    pub id: DbId,
    pub application_id: DbId,
    pub timestamp: Timestamp,
    pub action: String,
    pub comment: Option<String>,
    pub author_name: Option<String>,
}

/// List filters for applications. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<String>,
    pub application_type: Option<String>,
    pub responsible_person_id: Option<DbId>,
    /// `Some(true)`: only overdue; `Some(false)`: only not overdue.
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ApplicationFilter {
    pub const DEFAULT_PER_PAGE: i64 = 50;
    pub const MAX_PER_PAGE: i64 = 500;

    /// `(limit, offset)` for the requested page, 1-based.
    pub fn limit_offset(&self) -> (i64, i64) {
        let per_page = self
            .per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE);
        let page = self.page.unwrap_or(1).max(1);
        (per_page, (page - 1) * per_page)
    }
}
