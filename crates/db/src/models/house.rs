//! Mirrored house model.

use chrono::NaiveDate;
use clientdesk_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from `estate_houses`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct House {
    pub house_id: DbId,
    pub complex_name: Option<String>,
    pub name: Option<String>,
    pub warranty_house_end_date: Option<NaiveDate>,
    pub warranty_apartments_end_date: Option<NaiveDate>,
}

/// Outcome counters of a warranty upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarrantyUploadSummary {
    pub updated: u32,
    pub not_found: u32,
    pub errors: u32,
    pub messages: Vec<String>,
}
