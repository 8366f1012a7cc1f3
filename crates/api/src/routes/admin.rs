use axum::routing::get;
use axum::Router;

use crate::handlers::{email_logs, sync};
use crate::state::AppState;

/// Admin routes mounted at `/admin`.
///
/// ```text
/// GET  /sync         -> get_sync_status
/// POST /sync         -> trigger_sync
/// GET  /email-logs   -> list_email_logs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/sync",
            get(sync::get_sync_status).post(sync::trigger_sync),
        )
        .route("/email-logs", get(email_logs::list_email_logs))
}
