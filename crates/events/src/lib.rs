//! Application notifications.
//!
//! When an application is created, the responsible person receives an email
//! with a generated document attached:
//!
//! - [`document`]: template context and the [`DocumentRenderer`] seam.
//! - [`delivery`]: SMTP delivery behind the [`Mailer`] seam.
//! - [`notifier`]: the background service that ties both together and
//!   records every attempt in `email_logs`.

pub mod delivery;
pub mod document;
pub mod notifier;

pub use delivery::email::{EmailConfig, EmailDelivery, EmailError, Mailer, OutgoingEmail};
pub use document::{DocumentContext, DocumentRenderer, RenderError, RenderedDocument, TextTemplateRenderer};
pub use notifier::{ApplicationNotifier, NotificationQueue};
