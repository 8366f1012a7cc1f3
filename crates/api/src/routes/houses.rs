use axum::routing::get;
use axum::Router;

use crate::handlers::houses;
use crate::state::AppState;

/// House routes mounted at `/houses`.
///
/// ```text
/// GET  /           -> list_houses
/// GET  /warranty   -> warranty_template
/// POST /warranty   -> upload_warranty
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(houses::list_houses)).route(
        "/warranty",
        get(houses::warranty_template).post(houses::upload_warranty),
    )
}
