use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{applications, clients};
use crate::state::AppState;

/// Client routes mounted at `/clients`.
///
/// ```text
/// GET  /                    -> search_clients
/// GET  /{id}                -> get_client_card
/// POST /{id}/applications   -> create_application
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(clients::search_clients))
        .route("/{id}", get(clients::get_client_card))
        .route("/{id}/applications", post(applications::create_application))
}
