//! Service application lifecycle rules.
//!
//! An application is a service request (defect report, claim, document
//! request) opened by call-centre staff for a client. This module holds the
//! status set and its transition rules, due-date arithmetic, source
//! normalisation and defect-list validation. Persistence lives in the `db`
//! crate; this module only decides.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Application status. Stored as its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    InProgress,
    Done,
    PartiallyDone,
    Rejected,
    Closed,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::InProgress,
        ApplicationStatus::Done,
        ApplicationStatus::PartiallyDone,
        ApplicationStatus::Rejected,
        ApplicationStatus::Closed,
    ];

    /// Label persisted in `applications.status`.
    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::InProgress => "В работе",
            ApplicationStatus::Done => "Выполнено",
            ApplicationStatus::PartiallyDone => "Частично выполнено",
            ApplicationStatus::Rejected => "Отклонено",
            ApplicationStatus::Closed => "Закрыто",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label.trim())
    }

    /// Terminal statuses stamp `completed_at`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Done | ApplicationStatus::Rejected | ApplicationStatus::Closed
        )
    }
}

/// The outcome of a validated status change, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    /// New value of `completed_at`.
    pub completed_at: Option<Timestamp>,
    pub changed_at: Timestamp,
    /// Text of the history row.
    pub log_action: String,
}

/// Validate a status change and compute its side effects.
///
/// - A comment is mandatory.
/// - Changing to the current status is rejected as a conflict.
/// - Entering a terminal status sets `completed_at` unless already set.
/// - Leaving a terminal status for a non-terminal one clears it.
pub fn plan_status_change(
    current: &str,
    completed_at: Option<Timestamp>,
    requested: &str,
    comment: &str,
    now: Timestamp,
) -> Result<StatusChange, CoreError> {
    if comment.trim().is_empty() {
        return Err(CoreError::Validation(
            "A comment is required to change the status".into(),
        ));
    }
    let from = ApplicationStatus::from_label(current)
        .ok_or_else(|| CoreError::Internal(format!("Unknown stored status '{current}'")))?;
    let to = ApplicationStatus::from_label(requested)
        .ok_or_else(|| CoreError::Validation(format!("Unknown status '{requested}'")))?;
    if from == to {
        return Err(CoreError::Conflict(format!(
            "Application is already in status '{}'",
            to.label()
        )));
    }

    let completed_at = if to.is_terminal() {
        completed_at.or(Some(now))
    } else if from.is_terminal() {
        None
    } else {
        completed_at
    };

    Ok(StatusChange {
        from,
        to,
        completed_at,
        changed_at: now,
        log_action: format!("Статус изменен: {} -> {}", from.label(), to.label()),
    })
}

// ---------------------------------------------------------------------------
// Deadlines
// ---------------------------------------------------------------------------

/// Execution period used when an application type does not define one.
pub const DEFAULT_EXECUTION_DAYS: i32 = 3;

/// Due date of an application created at `created_at`.
///
/// Returns `None` when the type is unknown or has no positive period.
pub fn due_date(created_at: Timestamp, execution_days: Option<i32>) -> Option<Timestamp> {
    match execution_days {
        Some(days) if days > 0 => Some(created_at + Duration::days(i64::from(days))),
        _ => None,
    }
}

/// Clamp an administrator-supplied execution period.
pub fn normalize_execution_days(days: Option<i32>) -> i32 {
    match days {
        Some(d) if d >= 1 => d,
        _ => DEFAULT_EXECUTION_DAYS,
    }
}

/// An application is overdue when it has a deadline, is not completed, and
/// the deadline has passed.
pub fn is_overdue(
    due_date: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    now: Timestamp,
) -> bool {
    match (due_date, completed_at) {
        (Some(due), None) => now > due,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

pub const SOURCE_CALL: &str = "Звонок";
pub const SOURCE_TELEGRAM: &str = "Телеграм";
pub const SOURCE_OFFICE: &str = "Офис";
pub const SOURCE_OTHER: &str = "Другое";

pub const SOURCES: [&str; 4] = [SOURCE_CALL, SOURCE_TELEGRAM, SOURCE_OFFICE, SOURCE_OTHER];

/// Resolve the stored source of a new application.
///
/// Defaults to a phone call. "Other" with a non-empty custom text stores the
/// custom text instead.
pub fn resolve_source(source: Option<&str>, custom: Option<&str>) -> String {
    let source = source.map(str::trim).filter(|s| !s.is_empty());
    match source {
        None => SOURCE_CALL.to_string(),
        Some(SOURCE_OTHER) => custom
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(SOURCE_OTHER)
            .to_string(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// System client
// ---------------------------------------------------------------------------

/// Contact that owns applications not tied to a real client or agreement.
///
/// Its id is reserved outside the source's positive id range so it stays
/// stable when the contact table is reloaded.
pub const SYSTEM_CLIENT_ID: DbId = -1;
pub const SYSTEM_CLIENT_NAME: &str = "СИСТЕМНЫЙ КЛИЕНТ (для заявок без договора)";
pub const SYSTEM_CLIENT_PHONE: &str = "000-00-00";
pub const SYSTEM_AGREEMENT_NUMBER: &str = "SYSTEM-001";

/// Comment of a general application, prefixed with optional contact details.
pub fn general_comment(contact_name: Option<&str>, contact_phone: Option<&str>, comment: &str) -> String {
    let name = contact_name.map(str::trim).filter(|s| !s.is_empty());
    let phone = contact_phone.map(str::trim).filter(|s| !s.is_empty());
    if name.is_none() && phone.is_none() {
        return comment.to_string();
    }

    let mut parts = Vec::with_capacity(2);
    if let Some(name) = name {
        parts.push(format!("ФИО: {name}"));
    }
    if let Some(phone) = phone {
        parts.push(format!("Телефон: {phone}"));
    }
    format!("Контактные данные: {}\n\n{comment}", parts.join(", "))
}

// ---------------------------------------------------------------------------
// Defects
// ---------------------------------------------------------------------------

/// Type name that always requires a defect list.
pub const DEFECTS_TYPE_NAME: &str = "Дефекты";

/// A defect as submitted; either field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefectDraft {
    pub defect_type: Option<String>,
    pub description: Option<String>,
}

/// A complete defect ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Defect {
    pub defect_type: String,
    pub description: String,
}

/// Split submitted defects into complete ones and warnings for the rest.
///
/// Fails when the type requires a defect list and no complete defect is left.
pub fn validate_defects(
    type_name: &str,
    has_defect_list: bool,
    drafts: &[DefectDraft],
) -> Result<(Vec<Defect>, Vec<String>), CoreError> {
    let mut defects = Vec::with_capacity(drafts.len());
    let mut warnings = Vec::new();
    for (index, draft) in drafts.iter().enumerate() {
        let defect_type = draft.defect_type.as_deref().map(str::trim).unwrap_or("");
        let description = draft.description.as_deref().map(str::trim).unwrap_or("");
        if defect_type.is_empty() || description.is_empty() {
            warnings.push(format!(
                "Defect #{} is incomplete and was not saved",
                index + 1
            ));
            continue;
        }
        defects.push(Defect {
            defect_type: defect_type.to_string(),
            description: description.to_string(),
        });
    }

    if (has_defect_list || type_name == DEFECTS_TYPE_NAME) && defects.is_empty() {
        return Err(CoreError::Validation(format!(
            "Applications of type '{type_name}' need at least one complete defect"
        )));
    }
    Ok((defects, warnings))
}
