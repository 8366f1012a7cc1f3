//! Application type model and DTOs.

use clientdesk_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from `application_types`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApplicationType {
    pub id: DbId,
    pub name: String,
    /// Document template used for notifications; `None` skips the email.
    pub template_filename: Option<String>,
    pub has_defect_list: bool,
    pub execution_days: i32,
}

/// DTO for creating an application type.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateApplicationType {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub template_filename: Option<String>,
    #[serde(default)]
    pub has_defect_list: bool,
    /// Missing or non-positive values fall back to three days.
    pub execution_days: Option<i32>,
}

/// A row from `defect_types`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DefectType {
    pub id: DbId,
    pub name: String,
}
