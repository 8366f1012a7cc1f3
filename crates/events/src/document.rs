//! Documents attached to notification emails.
//!
//! A [`DocumentContext`] collects everything a template may reference. The
//! layout itself belongs to the renderer; [`TextTemplateRenderer`] fills
//! `{{ placeholder }}` fields of plain-text templates stored on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clientdesk_core::application::Defect;
use clientdesk_core::types::DbId;
use serde::Serialize;

/// Placeholder value for data the mirror does not have.
pub const MISSING: &str = "N/A";

/// Error type for document rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Invalid template name '{0}'")]
    InvalidName(String),

    #[error("Failed to read template: {0}")]
    Io(#[from] std::io::Error),
}

/// Values available to a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentContext {
    pub responsible_name: String,
    pub request_id: DbId,
    /// `DD.MM.YYYY`.
    pub today_date: String,
    pub agreement_number: String,
    pub client_name: String,
    pub client_phone: String,
    pub complex_name: String,
    pub house_name: String,
    pub entrance: String,
    pub flat_number: String,
    pub comment: String,
    pub defects: Vec<Defect>,
}

impl DocumentContext {
    /// Scalar fields as `(placeholder, value)` pairs.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("responsible_name", self.responsible_name.clone()),
            ("request_id", self.request_id.to_string()),
            ("today_date", self.today_date.clone()),
            ("agreement_number", self.agreement_number.clone()),
            ("client_name", self.client_name.clone()),
            ("client_phone", self.client_phone.clone()),
            ("complex_name", self.complex_name.clone()),
            ("house_name", self.house_name.clone()),
            ("entrance", self.entrance.clone()),
            ("flat_number", self.flat_number.clone()),
            ("comment", self.comment.clone()),
        ]
    }

    /// The defect list, one numbered line per defect.
    pub fn defect_lines(&self) -> String {
        self.defects
            .iter()
            .enumerate()
            .map(|(i, d)| format!("{}. {}: {}", i + 1, d.defect_type, d.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A rendered document ready to attach.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    /// File extension without the dot.
    pub extension: String,
    pub content_type: String,
}

/// Produces the attachment for an application from a named template.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        template: &str,
        context: &DocumentContext,
    ) -> Result<RenderedDocument, RenderError>;
}

/// Renders UTF-8 text templates from a directory.
///
/// `{{ name }}` (spaces optional) is replaced by the matching context field;
/// `{{ defects }}` by the numbered defect list. Unknown placeholders are left
/// untouched.
pub struct TextTemplateRenderer {
    template_dir: PathBuf,
}

impl TextTemplateRenderer {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
        }
    }

    /// Fill `template` with `context`.
    pub fn fill(template: &str, context: &DocumentContext) -> String {
        let mut out = template.to_string();
        let mut fields = context.fields();
        fields.push(("defects", context.defect_lines()));
        for (name, value) in fields {
            out = out
                .replace(&format!("{{{{{name}}}}}"), &value)
                .replace(&format!("{{{{ {name} }}}}"), &value);
        }
        out
    }

    fn resolve(&self, template: &str) -> Result<PathBuf, RenderError> {
        let name = Path::new(template);
        // Plain file names only; templates live directly in the directory.
        if name.components().count() != 1 || name.file_name().is_none() {
            return Err(RenderError::InvalidName(template.to_string()));
        }
        Ok(self.template_dir.join(name))
    }
}

#[async_trait]
impl DocumentRenderer for TextTemplateRenderer {
    async fn render(
        &self,
        template: &str,
        context: &DocumentContext,
    ) -> Result<RenderedDocument, RenderError> {
        let path = self.resolve(template)?;
        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::TemplateNotFound(template.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("txt")
            .to_string();
        Ok(RenderedDocument {
            bytes: Self::fill(&source, context).into_bytes(),
            extension,
            content_type: "text/plain; charset=utf-8".to_string(),
        })
    }
}
