//! Handlers for responsible persons and their routing by house or complex
//! and application type.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clientdesk_core::error::CoreError;
use clientdesk_core::types::DbId;
use clientdesk_db::models::responsible_person::{
    CreateResponsiblePerson, ResponsiblePerson, UpdateResponsiblePerson,
};
use clientdesk_db::repositories::{HouseRepo, ResponsiblePersonRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// A responsible person with decoded type list and house assignments.
#[derive(Debug, Serialize)]
pub struct ResponsiblePersonView {
    #[serde(flatten)]
    pub person: ResponsiblePerson,
    pub application_types: Vec<String>,
    pub house_ids: Vec<DbId>,
    pub complex_names: Vec<String>,
}

/// Either `house_id` or `complex_name` selects the houses.
#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub house_id: Option<DbId>,
    pub complex_name: Option<String>,
    pub application_type: String,
}

async fn view(state: &AppState, person: ResponsiblePerson) -> AppResult<ResponsiblePersonView> {
    let house_ids = ResponsiblePersonRepo::house_ids(&state.pool, person.id).await?;
    let complex_names = ResponsiblePersonRepo::complex_names(&state.pool, person.id).await?;
    Ok(ResponsiblePersonView {
        application_types: person.application_types(),
        house_ids,
        complex_names,
        person,
    })
}

/// Explicit house ids plus every house of the named complexes, deduplicated.
async fn resolve_houses(
    state: &AppState,
    house_ids: &[DbId],
    complex_names: &[String],
) -> AppResult<Vec<DbId>> {
    let mut resolved = house_ids.to_vec();
    resolved.extend(HouseRepo::ids_in_complexes(&state.pool, complex_names).await?);
    resolved.sort_unstable();
    resolved.dedup();
    Ok(resolved)
}

/// GET /api/v1/responsible-persons
pub async fn list_responsible_persons(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let persons = ResponsiblePersonRepo::list(&state.pool).await?;
    let mut views = Vec::with_capacity(persons.len());
    for person in persons {
        views.push(view(&state, person).await?);
    }
    Ok(Json(DataResponse { data: views }))
}

/// POST /api/v1/responsible-persons
///
/// Returns 409 when the email is already registered.
pub async fn create_responsible_person(
    State(state): State<AppState>,
    Json(mut input): Json<CreateResponsiblePerson>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    input.house_ids = resolve_houses(&state, &input.house_ids, &input.complex_names).await?;
    let person = ResponsiblePersonRepo::create(&state.pool, &input).await?;

    tracing::info!(
        responsible_person_id = person.id,
        houses = input.house_ids.len(),
        "Responsible person created",
    );

    let view = view(&state, person).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// PUT /api/v1/responsible-persons/{id}
///
/// Partial update. Sending `house_ids` or `complex_names` replaces every
/// assignment. Returns 409 when the new email is already registered.
pub async fn update_responsible_person(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateResponsiblePerson>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let house_ids = if input.replaces_assignments() {
        Some(
            resolve_houses(
                &state,
                input.house_ids.as_deref().unwrap_or_default(),
                input.complex_names.as_deref().unwrap_or_default(),
            )
            .await?,
        )
    } else {
        None
    };

    let person = ResponsiblePersonRepo::update(&state.pool, id, &input, house_ids.as_deref())
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ResponsiblePerson",
            id,
        }))?;

    tracing::info!(
        responsible_person_id = id,
        houses = house_ids.as_ref().map(Vec::len),
        "Responsible person updated",
    );

    let view = view(&state, person).await?;
    Ok(Json(DataResponse { data: view }))
}

/// DELETE /api/v1/responsible-persons/{id}
///
/// Applications assigned to the person keep existing without one.
pub async fn delete_responsible_person(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ResponsiblePersonRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ResponsiblePerson",
            id,
        }));
    }
    tracing::info!(responsible_person_id = id, "Responsible person deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/responsible-persons/lookup?house_id=&application_type=
/// GET /api/v1/responsible-persons/lookup?complex_name=&application_type=
///
/// Persons assigned to the house (or any house of the complex) who handle
/// the application type.
pub async fn lookup_responsible_persons(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> AppResult<impl IntoResponse> {
    let application_type = params.application_type.trim();
    let complex_name = params
        .complex_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let persons = match (params.house_id, complex_name) {
        (Some(house_id), _) => {
            ResponsiblePersonRepo::for_house_and_type(&state.pool, house_id, application_type)
                .await?
        }
        (None, Some(complex_name)) => {
            ResponsiblePersonRepo::for_complex_and_type(
                &state.pool,
                complex_name,
                application_type,
            )
            .await?
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either house_id or complex_name is required".into(),
            ))
        }
    };
    Ok(Json(DataResponse { data: persons }))
}
