//! Handlers for mirrored houses and warranty deadline uploads.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use clientdesk_core::warranty::{WarrantyRow, WARRANTY_DATE_FORMAT};
use clientdesk_db::models::house::WarrantyUploadSummary;
use clientdesk_db::repositories::HouseRepo;
use clientdesk_db::DbPool;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WarrantyUpload {
    pub rows: Vec<WarrantyRow>,
}

/// One row of the warranty template: current dates formatted for editing.
#[derive(Debug, Serialize)]
pub struct WarrantyTemplateRow {
    pub house_name: String,
    pub house_date: String,
    pub apartments_date: String,
}

/// GET /api/v1/houses
pub async fn list_houses(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let houses = HouseRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: houses }))
}

/// GET /api/v1/houses/warranty
///
/// One row per distinct named house with its current warranty dates, ready
/// to be edited and uploaded back.
pub async fn warranty_template(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut rows: Vec<WarrantyTemplateRow> = Vec::new();
    for house in HouseRepo::list(&state.pool).await? {
        let Some(name) = house.name.filter(|n| !n.trim().is_empty()) else {
            continue;
        };
        if rows.iter().any(|r| r.house_name == name) {
            continue;
        }
        let format = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.format(WARRANTY_DATE_FORMAT).to_string())
                .unwrap_or_default()
        };
        rows.push(WarrantyTemplateRow {
            house_name: name,
            house_date: format(house.warranty_house_end_date),
            apartments_date: format(house.warranty_apartments_end_date),
        });
    }
    rows.sort_by(|a, b| a.house_name.cmp(&b.house_name));
    Ok(Json(DataResponse { data: rows }))
}

/// POST /api/v1/houses/warranty
///
/// Apply uploaded warranty deadlines. Rows are numbered from 2 in messages
/// to match the spreadsheet they were exported from (row 1 is the header).
pub async fn upload_warranty(
    State(state): State<AppState>,
    Json(input): Json<WarrantyUpload>,
) -> AppResult<impl IntoResponse> {
    let summary = apply_warranty_rows(&state.pool, &input.rows).await?;
    tracing::info!(
        updated = summary.updated,
        not_found = summary.not_found,
        errors = summary.errors,
        "Warranty deadlines uploaded",
    );
    Ok(Json(DataResponse { data: summary }))
}

/// Apply rows one by one. A bad row is counted and reported, never fatal.
pub async fn apply_warranty_rows(
    pool: &DbPool,
    rows: &[WarrantyRow],
) -> Result<WarrantyUploadSummary, sqlx::Error> {
    let mut summary = WarrantyUploadSummary::default();

    for (index, row) in rows.iter().enumerate() {
        let line = index + 2;
        if row.is_blank() {
            continue;
        }

        let Some(name) = row
            .house_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            summary.errors += 1;
            summary
                .messages
                .push(format!("Row {line}: house name is missing"));
            continue;
        };

        let Some(house) = HouseRepo::find_by_name(pool, name).await? else {
            summary.not_found += 1;
            summary
                .messages
                .push(format!("Row {line}: house '{name}' not found"));
            continue;
        };

        let update = match row.validate() {
            Ok(update) => update,
            Err(e) => {
                summary.errors += 1;
                summary.messages.push(format!("Row {line}: {e}"));
                continue;
            }
        };

        if HouseRepo::set_warranty(pool, house.house_id, update.house_date, update.apartments_date)
            .await?
        {
            summary.updated += 1;
        } else {
            summary.not_found += 1;
            summary
                .messages
                .push(format!("Row {line}: house '{name}' not found"));
        }
    }

    Ok(summary)
}
