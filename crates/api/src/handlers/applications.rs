//! Handlers for the application lifecycle: creation, listing, status
//! changes, deletion and history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use clientdesk_core::application::{
    self, general_comment, plan_status_change, resolve_source, validate_defects,
    ApplicationStatus, DefectDraft, SYSTEM_AGREEMENT_NUMBER,
};
use clientdesk_core::error::CoreError;
use clientdesk_core::types::{DbId, Timestamp};
use clientdesk_db::models::application::{
    Application, ApplicationDefect, ApplicationFilter, NewApplication,
};
use clientdesk_db::repositories::{
    ApplicationRepo, ApplicationTypeRepo, ContactRepo, EmailLogRepo, ResponsiblePersonRepo,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

const ACTION_CREATED: &str = "Заявка создана";
const ACTION_CREATED_GENERAL: &str = "Заявка создана (без привязки к клиенту)";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /clients/{id}/applications`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateApplicationRequest {
    #[validate(length(min = 1, max = 100))]
    pub agreement_number: String,
    #[validate(length(min = 1, max = 100))]
    pub application_type: String,
    #[validate(length(min = 1))]
    pub comment: String,
    pub responsible_person_id: DbId,
    pub source: Option<String>,
    /// Free-text source used when `source` is "Другое".
    pub custom_source: Option<String>,
    pub creator_name: Option<String>,
    #[serde(default)]
    pub defects: Vec<DefectDraft>,
}

/// Body of `POST /applications/general`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGeneralApplicationRequest {
    #[validate(length(min = 1, max = 100))]
    pub application_type: String,
    #[validate(length(min = 1))]
    pub comment: String,
    pub responsible_person_id: DbId,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub source: Option<String>,
    pub custom_source: Option<String>,
    pub creator_name: Option<String>,
    #[serde(default)]
    pub defects: Vec<DefectDraft>,
}

/// Body of `PUT /applications/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
    #[serde(default)]
    pub comment: String,
    pub author_name: Option<String>,
}

/// An application with its computed overdue flag.
#[derive(Debug, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub overdue: bool,
}

impl ApplicationView {
    pub fn new(application: Application, now: Timestamp) -> Self {
        let overdue = application.is_overdue(now);
        Self {
            application,
            overdue,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: ApplicationView,
    pub defects: Vec<ApplicationDefect>,
}

/// Result of a creation. `warnings` lists defects that were dropped.
#[derive(Debug, Serialize)]
pub struct CreatedApplication {
    pub application: ApplicationView,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Validated fields shared by both creation endpoints.
struct Submission {
    client_id: DbId,
    agreement_number: String,
    application_type: String,
    comment: String,
    responsible_person_id: DbId,
    source: String,
    creator_name: Option<String>,
    defects: Vec<DefectDraft>,
    log_action: &'static str,
}

/// Persist a new application and queue its notification.
async fn submit(state: &AppState, submission: Submission) -> AppResult<CreatedApplication> {
    let responsible =
        ResponsiblePersonRepo::find_by_id(&state.pool, submission.responsible_person_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "ResponsiblePerson",
                id: submission.responsible_person_id,
            }))?;

    let application_type =
        ApplicationTypeRepo::find_by_name(&state.pool, submission.application_type.trim())
            .await?;
    let has_defect_list = application_type
        .as_ref()
        .is_some_and(|t| t.has_defect_list);
    let (defects, warnings) = validate_defects(
        &submission.application_type,
        has_defect_list,
        &submission.defects,
    )?;

    let now = Utc::now();
    let due_date = application::due_date(now, application_type.map(|t| t.execution_days));

    let input = NewApplication {
        client_id: submission.client_id,
        creator_name: submission.creator_name,
        agreement_number: submission.agreement_number.trim().to_string(),
        application_type: submission.application_type.trim().to_string(),
        comment: submission.comment,
        status: ApplicationStatus::InProgress.label(),
        responsible_person_id: responsible.id,
        source: submission.source,
        created_at: now,
        due_date,
        defects,
        log_action: submission.log_action.to_string(),
        log_comment: Some(format!("Назначен ответственный: {}", responsible.full_name)),
    };
    let created = ApplicationRepo::create(&state.pool, &input).await?;

    tracing::info!(
        application_id = created.id,
        client_id = created.client_id,
        application_type = %created.application_type,
        dropped_defects = warnings.len(),
        "Application created",
    );
    state.notifications.enqueue(created.id);

    Ok(CreatedApplication {
        application: ApplicationView::new(created, now),
        warnings,
    })
}

/// POST /api/v1/clients/{id}/applications
///
/// Create an application for a mirrored client. Returns 201 with any
/// warnings about dropped defects; the notification is sent in the
/// background.
pub async fn create_application(
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
    Json(input): Json<CreateApplicationRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    ContactRepo::find_by_id(&state.pool, client_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Client",
            id: client_id,
        }))?;

    let created = submit(
        &state,
        Submission {
            client_id,
            agreement_number: input.agreement_number,
            application_type: input.application_type,
            comment: input.comment,
            responsible_person_id: input.responsible_person_id,
            source: resolve_source(input.source.as_deref(), input.custom_source.as_deref()),
            creator_name: input.creator_name,
            defects: input.defects,
            log_action: ACTION_CREATED,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// POST /api/v1/applications/general
///
/// Create an application that is not tied to a client or agreement. It is
/// owned by the system client; optional contact details are prefixed to the
/// comment.
pub async fn create_general_application(
    State(state): State<AppState>,
    Json(input): Json<CreateGeneralApplicationRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let system_client = ContactRepo::ensure_system_client(&state.pool).await?;
    let comment = general_comment(
        input.contact_name.as_deref(),
        input.contact_phone.as_deref(),
        &input.comment,
    );

    let created = submit(
        &state,
        Submission {
            client_id: system_client.id,
            agreement_number: SYSTEM_AGREEMENT_NUMBER.to_string(),
            application_type: input.application_type,
            comment,
            responsible_person_id: input.responsible_person_id,
            source: resolve_source(input.source.as_deref(), input.custom_source.as_deref()),
            creator_name: input.creator_name,
            defects: input.defects,
            log_action: ACTION_CREATED_GENERAL,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/applications
///
/// Filter by `status`, `application_type`, `responsible_person_id` and
/// `overdue`; paginated with `page` / `per_page`.
pub async fn list_applications(
    State(state): State<AppState>,
    Query(filter): Query<ApplicationFilter>,
) -> AppResult<impl IntoResponse> {
    let now = Utc::now();
    let applications = ApplicationRepo::list(&state.pool, &filter, now)
        .await?
        .into_iter()
        .map(|a| ApplicationView::new(a, now))
        .collect::<Vec<_>>();

    Ok(Json(DataResponse { data: applications }))
}

/// GET /api/v1/applications/{id}
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let application = find_application(&state, id).await?;
    let defects = ApplicationRepo::defects(&state.pool, id).await?;

    Ok(Json(DataResponse {
        data: ApplicationDetail {
            application: ApplicationView::new(application, Utc::now()),
            defects,
        },
    }))
}

/// GET /api/v1/applications/{id}/logs
///
/// History of the application, oldest first.
pub async fn list_application_logs(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_application(&state, id).await?;
    let logs = ApplicationRepo::logs(&state.pool, id).await?;
    Ok(Json(DataResponse { data: logs }))
}

/// GET /api/v1/applications/{id}/email-logs
///
/// Notification attempts for the application. Also works after the
/// application was deleted.
pub async fn list_application_email_logs(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let logs = EmailLogRepo::list_for_application(&state.pool, id).await?;
    Ok(Json(DataResponse { data: logs }))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// PUT /api/v1/applications/{id}/status
///
/// Change the status. A comment is required and the new status must differ
/// from the current one.
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ChangeStatusRequest>,
) -> AppResult<impl IntoResponse> {
    let current = find_application(&state, id).await?;
    let now = Utc::now();
    let change = plan_status_change(
        &current.status,
        current.completed_at,
        &input.status,
        &input.comment,
        now,
    )?;

    let updated = ApplicationRepo::update_status(
        &state.pool,
        id,
        &change,
        input.comment.trim(),
        input.author_name.as_deref(),
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "Application",
        id,
    }))?;

    tracing::info!(
        application_id = id,
        from = change.from.label(),
        to = change.to.label(),
        "Application status changed",
    );

    Ok(Json(DataResponse {
        data: ApplicationView::new(updated, now),
    }))
}

/// DELETE /api/v1/applications/{id}
///
/// Permanently delete an application with its defects and history.
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ApplicationRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Application",
            id,
        }));
    }
    tracing::info!(application_id = id, "Application deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_application(state: &AppState, id: DbId) -> AppResult<Application> {
    ApplicationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Application",
            id,
        }))
}
