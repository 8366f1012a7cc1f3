//! Mirrored sellable unit (apartment) model.

use clientdesk_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from `estate_sells`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Sell {
    pub estate_sell_id: DbId,
    pub estate_sell_category: Option<String>,
    pub house_id: Option<DbId>,
    pub estate_rooms: Option<i64>,
    pub geo_house_entrance: Option<String>,
    pub estate_floor: Option<i64>,
    pub estate_riser: Option<String>,
    pub geo_flatnum: Option<String>,
}
