//! Repository for the mirrored `estate_deals` table.

use clientdesk_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::deal::DealDetail;

/// Deal joined with its apartment and house. Sells and houses are optional.
const DETAIL_SELECT: &str = "SELECT
        d.id, d.agreement_number, d.deal_status_name, d.agreement_date,
        d.deal_sum, d.finances_income_reserved, d.estate_sell_id,
        s.estate_floor, s.estate_riser, s.geo_flatnum, s.geo_house_entrance, s.estate_rooms,
        h.house_id, h.complex_name, h.name AS house_name,
        h.warranty_house_end_date, h.warranty_apartments_end_date
    FROM estate_deals d
    LEFT JOIN estate_sells s ON s.estate_sell_id = d.estate_sell_id
    LEFT JOIN estate_houses h ON h.house_id = s.house_id";

/// Provides read access to deals.
pub struct DealRepo;

impl DealRepo {
    /// Deals of a client that carry an agreement number, by agreement number.
    pub async fn list_for_contact(
        pool: &SqlitePool,
        contact_id: DbId,
    ) -> Result<Vec<DealDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE d.contacts_buy_id = $1
               AND d.agreement_number IS NOT NULL
               AND TRIM(d.agreement_number) <> ''
             ORDER BY d.agreement_number, d.id"
        );
        sqlx::query_as::<_, DealDetail>(&query)
            .bind(contact_id)
            .fetch_all(pool)
            .await
    }

    /// The deal of a client with the given agreement number, if any.
    pub async fn find_by_agreement(
        pool: &SqlitePool,
        contact_id: DbId,
        agreement_number: &str,
    ) -> Result<Option<DealDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE d.contacts_buy_id = $1 AND d.agreement_number = $2
             ORDER BY d.id LIMIT 1"
        );
        sqlx::query_as::<_, DealDetail>(&query)
            .bind(contact_id)
            .bind(agreement_number)
            .fetch_optional(pool)
            .await
    }
}
