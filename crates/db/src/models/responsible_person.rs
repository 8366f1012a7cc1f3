//! Responsible person model and DTOs.

use clientdesk_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from `responsible_persons`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ResponsiblePerson {
    pub id: DbId,
    pub full_name: String,
    pub email: String,
    #[serde(skip)]
    pub application_types_json: String,
}

impl ResponsiblePerson {
    /// Application type names this person handles. Malformed JSON reads as
    /// an empty list.
    pub fn application_types(&self) -> Vec<String> {
        serde_json::from_str(&self.application_types_json).unwrap_or_default()
    }

    pub fn handles(&self, application_type: &str) -> bool {
        self.application_types()
            .iter()
            .any(|t| t == application_type)
    }
}

/// DTO for creating a responsible person.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateResponsiblePerson {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub application_types: Vec<String>,
    /// Mirrored houses this person is assigned to.
    #[serde(default)]
    pub house_ids: Vec<DbId>,
    /// Residential complexes; every house of each complex is assigned.
    #[serde(default)]
    pub complex_names: Vec<String>,
}

/// DTO for updating a responsible person. `None` keeps the current value.
///
/// When either `house_ids` or `complex_names` is present, the assignments
/// are replaced by the houses they resolve to.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateResponsiblePerson {
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub application_types: Option<Vec<String>>,
    pub house_ids: Option<Vec<DbId>>,
    pub complex_names: Option<Vec<String>>,
}

impl UpdateResponsiblePerson {
    pub fn replaces_assignments(&self) -> bool {
        self.house_ids.is_some() || self.complex_names.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(json: &str) -> ResponsiblePerson {
        ResponsiblePerson {
            id: 1,
            full_name: "Петров".into(),
            email: "p@example.com".into(),
            application_types_json: json.into(),
        }
    }

    #[test]
    fn handles_listed_types_only() {
        let p = person(r#"["Дефекты","Справка"]"#);
        assert!(p.handles("Дефекты"));
        assert!(!p.handles("Претензия"));
    }

    #[test]
    fn malformed_json_handles_nothing() {
        assert!(person("not json").application_types().is_empty());
    }
}
