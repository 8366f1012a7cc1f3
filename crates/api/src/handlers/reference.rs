//! Handlers for application types and defect types.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clientdesk_core::error::CoreError;
use clientdesk_core::types::DbId;
use clientdesk_db::models::application_type::CreateApplicationType;
use clientdesk_db::repositories::ApplicationTypeRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDefectType {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// GET /api/v1/application-types
pub async fn list_application_types(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let types = ApplicationTypeRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: types }))
}

/// POST /api/v1/application-types
pub async fn create_application_type(
    State(state): State<AppState>,
    Json(input): Json<CreateApplicationType>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let created = ApplicationTypeRepo::create(&state.pool, &input).await?;
    tracing::info!(
        application_type_id = created.id,
        name = %created.name,
        execution_days = created.execution_days,
        "Application type created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// DELETE /api/v1/application-types/{id}
pub async fn delete_application_type(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ApplicationTypeRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ApplicationType",
            id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/defect-types
pub async fn list_defect_types(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let types = ApplicationTypeRepo::list_defect_types(&state.pool).await?;
    Ok(Json(DataResponse { data: types }))
}

/// POST /api/v1/defect-types
pub async fn create_defect_type(
    State(state): State<AppState>,
    Json(input): Json<CreateDefectType>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let created = ApplicationTypeRepo::create_defect_type(&state.pool, input.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// DELETE /api/v1/defect-types/{id}
pub async fn delete_defect_type(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ApplicationTypeRepo::delete_defect_type(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "DefectType",
            id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}
