//! Handlers for client search and the client card.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use clientdesk_core::error::CoreError;
use clientdesk_core::types::DbId;
use clientdesk_db::models::contact::Contact;
use clientdesk_db::models::deal::DealDetail;
use clientdesk_db::repositories::{ApplicationRepo, ContactRepo, DealRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::applications::ApplicationView;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_PER_PAGE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct ClientSearchParams {
    /// Substring of a name, phone or agreement number.
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Everything the client card shows.
#[derive(Debug, Serialize)]
pub struct ClientCard {
    pub client: Contact,
    /// Deals with an agreement number, with apartment, house and warranty
    /// dates.
    pub deals: Vec<DealDetail>,
    /// Newest first.
    pub applications: Vec<ApplicationView>,
}

/// GET /api/v1/clients?q=&page=&per_page=
pub async fn search_clients(
    State(state): State<AppState>,
    Query(params): Query<ClientSearchParams>,
) -> AppResult<impl IntoResponse> {
    let page = ContactRepo::search(
        &state.pool,
        params.q.as_deref(),
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )
    .await?;

    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/clients/{id}
pub async fn get_client_card(
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let client = ContactRepo::find_by_id(&state.pool, client_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Client",
            id: client_id,
        }))?;
    let deals = DealRepo::list_for_contact(&state.pool, client_id).await?;

    let now = Utc::now();
    let applications = ApplicationRepo::list_for_client(&state.pool, client_id)
        .await?
        .into_iter()
        .map(|a| ApplicationView::new(a, now))
        .collect();

    Ok(Json(DataResponse {
        data: ClientCard {
            client,
            deals,
            applications,
        },
    }))
}
