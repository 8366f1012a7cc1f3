//! Routes for reference data: application types, defect types and
//! responsible persons.

use axum::routing::{delete, get, put};
use axum::Router;

use crate::handlers::{reference, responsible};
use crate::state::AppState;

/// ```text
/// GET    /application-types            -> list_application_types
/// POST   /application-types            -> create_application_type
/// DELETE /application-types/{id}       -> delete_application_type
/// GET    /defect-types                 -> list_defect_types
/// POST   /defect-types                 -> create_defect_type
/// DELETE /defect-types/{id}            -> delete_defect_type
/// GET    /responsible-persons          -> list_responsible_persons
/// POST   /responsible-persons          -> create_responsible_person
/// GET    /responsible-persons/lookup   -> lookup_responsible_persons
/// PUT    /responsible-persons/{id}     -> update_responsible_person
/// DELETE /responsible-persons/{id}     -> delete_responsible_person
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/application-types",
            get(reference::list_application_types).post(reference::create_application_type),
        )
        .route(
            "/application-types/{id}",
            delete(reference::delete_application_type),
        )
        .route(
            "/defect-types",
            get(reference::list_defect_types).post(reference::create_defect_type),
        )
        .route("/defect-types/{id}", delete(reference::delete_defect_type))
        .route(
            "/responsible-persons",
            get(responsible::list_responsible_persons)
                .post(responsible::create_responsible_person),
        )
        .route(
            "/responsible-persons/lookup",
            get(responsible::lookup_responsible_persons),
        )
        .route(
            "/responsible-persons/{id}",
            put(responsible::update_responsible_person)
                .delete(responsible::delete_responsible_person),
        )
}
