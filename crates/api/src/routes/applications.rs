use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::applications;
use crate::state::AppState;

/// Application routes mounted at `/applications`.
///
/// ```text
/// GET    /                  -> list_applications
/// POST   /general           -> create_general_application
/// GET    /{id}              -> get_application
/// DELETE /{id}              -> delete_application
/// PUT    /{id}/status       -> change_status
/// GET    /{id}/logs         -> list_application_logs
/// GET    /{id}/email-logs   -> list_application_email_logs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(applications::list_applications))
        .route("/general", post(applications::create_general_application))
        .route(
            "/{id}",
            get(applications::get_application).delete(applications::delete_application),
        )
        .route("/{id}/status", put(applications::change_status))
        .route("/{id}/logs", get(applications::list_application_logs))
        .route(
            "/{id}/email-logs",
            get(applications::list_application_email_logs),
        )
}
