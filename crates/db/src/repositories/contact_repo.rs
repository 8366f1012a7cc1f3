//! Repository for the mirrored `estate_deals_contacts` table.

use clientdesk_core::application::{SYSTEM_CLIENT_ID, SYSTEM_CLIENT_NAME, SYSTEM_CLIENT_PHONE};
use clientdesk_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::contact::{Contact, ContactPage};

const COLUMNS: &str = "c.id, c.contacts_buy_name, c.contacts_buy_phones";

/// Matches a contact by name, phone, or the agreement number of any deal.
const SEARCH_PREDICATE: &str = "(
        $1 IS NULL
        OR c.contacts_buy_name LIKE $1
        OR c.contacts_buy_phones LIKE $1
        OR EXISTS (
            SELECT 1 FROM estate_deals d
            WHERE d.contacts_buy_id = c.id AND d.agreement_number LIKE $1
        )
    )";

/// Provides read access to clients (buyers).
pub struct ContactRepo;

impl ContactRepo {
    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<Contact>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM estate_deals_contacts c WHERE c.id = $1");
        sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Search clients by a substring of name, phone or agreement number.
    ///
    /// `page` is 1-based. An empty term lists every client.
    pub async fn search(
        pool: &SqlitePool,
        term: Option<&str>,
        page: i64,
        per_page: i64,
    ) -> Result<ContactPage, sqlx::Error> {
        let pattern = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| format!("%{t}%"));
        let page = page.max(1);
        let per_page = per_page.clamp(1, 200);

        let count_query =
            format!("SELECT COUNT(*) FROM estate_deals_contacts c WHERE {SEARCH_PREDICATE}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM estate_deals_contacts c WHERE {SEARCH_PREDICATE}
             ORDER BY c.contacts_buy_name, c.id LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, Contact>(&query)
            .bind(&pattern)
            .bind(per_page)
            .bind((page - 1) * per_page)
            .fetch_all(pool)
            .await?;

        Ok(ContactPage {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Make sure the system client exists. Idempotent.
    ///
    /// The contact table is reloaded by every sync cycle, so this runs after
    /// each successful cycle as well as at startup.
    pub async fn ensure_system_client(pool: &SqlitePool) -> Result<Contact, sqlx::Error> {
        sqlx::query(
            "INSERT INTO estate_deals_contacts (id, contacts_buy_name, contacts_buy_phones)
             VALUES ($1, $2, $3)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(SYSTEM_CLIENT_ID)
        .bind(SYSTEM_CLIENT_NAME)
        .bind(SYSTEM_CLIENT_PHONE)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, SYSTEM_CLIENT_ID)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}
