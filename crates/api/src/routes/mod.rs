pub mod admin;
pub mod applications;
pub mod clients;
pub mod health;
pub mod houses;
pub mod reference;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /clients                                   search (?q=&page=&per_page=)
/// /clients/{id}                              client card
/// /clients/{id}/applications                 create application (POST)
///
/// /applications                              list (?status=&overdue=&...)
/// /applications/general                      create without client (POST)
/// /applications/{id}                         get, delete
/// /applications/{id}/status                  change status (PUT)
/// /applications/{id}/logs                    history
/// /applications/{id}/email-logs              notification attempts
///
/// /application-types                         list, create
/// /application-types/{id}                    delete
/// /defect-types                              list, create
/// /defect-types/{id}                         delete
/// /responsible-persons                       list, create
/// /responsible-persons/lookup                by house or complex, and type
/// /responsible-persons/{id}                  update, delete
///
/// /houses                                    list
/// /houses/warranty                           template (GET), upload (POST)
///
/// /admin/sync                                status (GET), trigger (POST)
/// /admin/email-logs                          recent notification attempts
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/clients", clients::router())
        .nest("/applications", applications::router())
        .merge(reference::router())
        .nest("/houses", houses::router())
        .nest("/admin", admin::router())
}
