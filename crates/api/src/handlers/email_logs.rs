use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use clientdesk_db::repositories::EmailLogRepo;

use crate::error::AppResult;
use crate::query::LimitParams;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

/// GET /api/v1/email-logs?limit=
///
/// Most recent notification attempts first.
pub async fn list_email_logs(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> AppResult<impl IntoResponse> {
    let logs =
        EmailLogRepo::list_recent(&state.pool, params.limit.unwrap_or(DEFAULT_LIMIT)).await?;
    Ok(Json(DataResponse { data: logs }))
}
