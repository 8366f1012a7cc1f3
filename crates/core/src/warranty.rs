//! Warranty deadline uploads.
//!
//! Warranty end dates are the only locally edited fields of a mirrored house.
//! Administrators upload rows of `(house name, house date, apartments date)`;
//! dates are written `DD.MM.YYYY`. Empty cells leave the stored value as is.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::CoreError;

/// Display and upload format of warranty dates.
pub const WARRANTY_DATE_FORMAT: &str = "%d.%m.%Y";

/// One uploaded row before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WarrantyRow {
    pub house_name: Option<String>,
    pub house_date: Option<String>,
    pub apartments_date: Option<String>,
}

/// A validated row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarrantyUpdate {
    pub house_name: String,
    pub house_date: Option<NaiveDate>,
    pub apartments_date: Option<NaiveDate>,
}

/// Parse a warranty date. Accepts `DD.MM.YYYY` and, for spreadsheet cells
/// exported as ISO dates, `YYYY-MM-DD`.
pub fn parse_warranty_date(raw: &str) -> Result<NaiveDate, CoreError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, WARRANTY_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| {
            CoreError::Validation(format!("Invalid date '{raw}', expected DD.MM.YYYY"))
        })
}

fn parse_optional(raw: Option<&str>) -> Result<Option<NaiveDate>, CoreError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_warranty_date(value).map(Some),
        None => Ok(None),
    }
}

impl WarrantyRow {
    /// Whether every cell is empty. Such rows are skipped silently.
    pub fn is_blank(&self) -> bool {
        [&self.house_name, &self.house_date, &self.apartments_date]
            .iter()
            .all(|cell| cell.as_deref().map_or(true, |v| v.trim().is_empty()))
    }

    pub fn validate(&self) -> Result<WarrantyUpdate, CoreError> {
        let house_name = self
            .house_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::Validation("House name is missing".into()))?;

        Ok(WarrantyUpdate {
            house_name: house_name.to_string(),
            house_date: parse_optional(self.house_date.as_deref())?,
            apartments_date: parse_optional(self.apartments_date.as_deref())?,
        })
    }
}
