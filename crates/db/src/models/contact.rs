//! Mirrored contact (buyer) model.

use clientdesk_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from `estate_deals_contacts`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contact {
    pub id: DbId,
    pub contacts_buy_name: Option<String>,
    pub contacts_buy_phones: Option<String>,
}

/// A page of client search results.
#[derive(Debug, Clone, Serialize)]
pub struct ContactPage {
    pub items: Vec<Contact>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}
