//! Mirrored deal model and the joined view used by client cards.

use chrono::NaiveDate;
use clientdesk_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from `estate_deals`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Deal {
    pub id: DbId,
    pub estate_sell_id: Option<DbId>,
    pub deal_status_name: Option<String>,
    pub agreement_number: Option<String>,
    pub agreement_date: Option<NaiveDate>,
    pub deal_sum: Option<f64>,
    pub deal_area: Option<f64>,
    pub contacts_buy_id: Option<DbId>,
    pub finances_income_reserved: Option<f64>,
}

/// A deal joined with its apartment and house.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DealDetail {
    pub id: DbId,
    pub agreement_number: Option<String>,
    pub deal_status_name: Option<String>,
    pub agreement_date: Option<NaiveDate>,
    pub deal_sum: Option<f64>,
    pub finances_income_reserved: Option<f64>,
    pub estate_sell_id: Option<DbId>,
    pub estate_floor: Option<i64>,
    pub estate_riser: Option<String>,
    pub geo_flatnum: Option<String>,
    pub geo_house_entrance: Option<String>,
    pub estate_rooms: Option<i64>,
    pub house_id: Option<DbId>,
    pub complex_name: Option<String>,
    pub house_name: Option<String>,
    pub warranty_house_end_date: Option<NaiveDate>,
    pub warranty_apartments_end_date: Option<NaiveDate>,
}
