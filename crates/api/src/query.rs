//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Page-based pagination (`?page=&per_page=`). Both values are clamped in
/// the repository layer.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// `?limit=` for "most recent N" listings.
#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}
