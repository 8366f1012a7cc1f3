//! Notification service for newly created applications.
//!
//! Request handlers enqueue the id of a new application on a
//! [`NotificationQueue`] and return immediately. [`ApplicationNotifier::run`]
//! consumes the queue in the background: it renders the type's document,
//! emails it to the responsible person and writes one `email_logs` row per
//! application, whatever the outcome.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clientdesk_core::application::Defect;
use clientdesk_core::types::DbId;
use clientdesk_core::warranty::WARRANTY_DATE_FORMAT;
use clientdesk_db::models::application::Application;
use clientdesk_db::models::contact::Contact;
use clientdesk_db::models::deal::DealDetail;
use clientdesk_db::models::email_log::{
    CreateEmailLog, EmailLog, EMAIL_STATUS_FAILED, EMAIL_STATUS_SKIPPED, EMAIL_STATUS_SUCCESS,
};
use clientdesk_db::models::responsible_person::ResponsiblePerson;
use clientdesk_db::repositories::{
    ApplicationRepo, ApplicationTypeRepo, ContactRepo, DealRepo, EmailLogRepo,
    ResponsiblePersonRepo,
};
use clientdesk_db::DbPool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::delivery::email::{Mailer, OutgoingEmail};
use crate::document::{DocumentContext, DocumentRenderer, MISSING};

/// Sending half of the notification queue. Cheap to clone.
#[derive(Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<DbId>,
}

impl NotificationQueue {
    /// Queue a notification for `application_id`. Never blocks; a full or
    /// closed queue drops the request with a warning.
    pub fn enqueue(&self, application_id: DbId) {
        if let Err(e) = self.sender.try_send(application_id) {
            tracing::warn!(application_id, error = %e, "Notification dropped");
        }
    }
}

/// Renders and emails application documents.
pub struct ApplicationNotifier {
    pool: DbPool,
    renderer: Arc<dyn DocumentRenderer>,
    /// `None` when SMTP is not configured.
    mailer: Option<Arc<dyn Mailer>>,
}

impl ApplicationNotifier {
    pub fn new(
        pool: DbPool,
        renderer: Arc<dyn DocumentRenderer>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self {
            pool,
            renderer,
            mailer,
        }
    }

    /// Create a bounded queue and its receiving end.
    pub fn channel(capacity: usize) -> (NotificationQueue, mpsc::Receiver<DbId>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (NotificationQueue { sender }, receiver)
    }

    /// Process queued notifications until the queue closes or `cancel` fires.
    pub async fn run(self, mut receiver: mpsc::Receiver<DbId>, cancel: CancellationToken) {
        tracing::info!(smtp = self.mailer.is_some(), "Notification service started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Notification service stopping");
                    break;
                }
                next = receiver.recv() => {
                    let Some(application_id) = next else {
                        tracing::info!("Notification queue closed");
                        break;
                    };
                    if let Err(e) = self.notify(application_id).await {
                        tracing::error!(application_id, error = %e, "Failed to record notification");
                    }
                }
            }
        }
    }

    /// Attempt delivery for one application and record the result.
    pub async fn notify(&self, application_id: DbId) -> Result<EmailLog, sqlx::Error> {
        let attempt = self.attempt(application_id).await?;
        match attempt.status {
            EMAIL_STATUS_FAILED => tracing::error!(
                application_id,
                reason = attempt.server_response.as_deref().unwrap_or_default(),
                "Notification failed",
            ),
            status => tracing::info!(application_id, status, "Notification processed"),
        }
        EmailLogRepo::create(&self.pool, &attempt).await
    }

    async fn attempt(&self, application_id: DbId) -> Result<CreateEmailLog, sqlx::Error> {
        let Some(application) = ApplicationRepo::find_by_id(&self.pool, application_id).await?
        else {
            return Ok(log(
                application_id,
                EMAIL_STATUS_FAILED,
                None,
                None,
                format!("Application #{application_id} not found"),
            ));
        };

        let responsible = match application.responsible_person_id {
            Some(id) => ResponsiblePersonRepo::find_by_id(&self.pool, id).await?,
            None => None,
        };
        let recipient = responsible.as_ref().map(|p| p.email.clone());

        let template = ApplicationTypeRepo::find_by_name(&self.pool, &application.application_type)
            .await?
            .and_then(|t| t.template_filename)
            .filter(|t| !t.trim().is_empty());
        let Some(template) = template else {
            return Ok(log(
                application_id,
                EMAIL_STATUS_SKIPPED,
                Some(recipient.unwrap_or_else(|| MISSING.to_string())),
                Some(format!("Пропуск отправки для заявки #{application_id}")),
                format!(
                    "No template configured for application type '{}'",
                    application.application_type
                ),
            ));
        };

        let subject = format!(
            "Новая заявка: {} №{}",
            application.application_type, application.id
        );
        let Some(mailer) = &self.mailer else {
            return Ok(log(
                application_id,
                EMAIL_STATUS_SKIPPED,
                recipient,
                Some(subject),
                "SMTP is not configured".to_string(),
            ));
        };
        let Some(responsible) = responsible else {
            return Ok(log(
                application_id,
                EMAIL_STATUS_FAILED,
                None,
                Some(subject),
                "No responsible person assigned".to_string(),
            ));
        };

        let client = ContactRepo::find_by_id(&self.pool, application.client_id).await?;
        let deal = DealRepo::find_by_agreement(
            &self.pool,
            application.client_id,
            &application.agreement_number,
        )
        .await?;
        let defects = ApplicationRepo::defects(&self.pool, application.id)
            .await?
            .into_iter()
            .map(|d| Defect {
                defect_type: d.defect_type,
                description: d.description,
            })
            .collect();

        let context = build_context(
            &application,
            Some(&responsible),
            client.as_ref(),
            deal.as_ref(),
            defects,
            Utc::now().date_naive(),
        );

        let document = match self.renderer.render(&template, &context).await {
            Ok(document) => document,
            Err(e) => {
                return Ok(log(
                    application_id,
                    EMAIL_STATUS_FAILED,
                    Some(responsible.email),
                    Some(subject),
                    e.to_string(),
                ));
            }
        };

        let email = OutgoingEmail {
            to: responsible.email.clone(),
            subject: subject.clone(),
            body: format!(
                "Поступила новая заявка №{} ({}). Подробности в прикрепленном файле.",
                application.id, application.application_type
            ),
            attachment_name: format!("Application_{}.{}", application.id, document.extension),
            attachment_content_type: document.content_type,
            attachment: document.bytes,
        };

        let (status, response) = match mailer.send(email).await {
            Ok(reply) => (EMAIL_STATUS_SUCCESS, reply),
            Err(e) => (EMAIL_STATUS_FAILED, e.to_string()),
        };
        Ok(log(
            application_id,
            status,
            Some(responsible.email),
            Some(subject),
            response,
        ))
    }
}

fn log(
    application_id: DbId,
    status: &'static str,
    recipient: Option<String>,
    subject: Option<String>,
    server_response: String,
) -> CreateEmailLog {
    CreateEmailLog {
        application_id: Some(application_id),
        recipient,
        subject,
        status,
        server_response: Some(server_response),
    }
}

fn or_missing(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(MISSING)
        .to_string()
}

/// Template context of an application. Data missing from the mirror reads
/// as `N/A`.
pub fn build_context(
    application: &Application,
    responsible: Option<&ResponsiblePerson>,
    client: Option<&Contact>,
    deal: Option<&DealDetail>,
    defects: Vec<Defect>,
    today: NaiveDate,
) -> DocumentContext {
    DocumentContext {
        responsible_name: responsible
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|| "Не назначен".to_string()),
        request_id: application.id,
        today_date: today.format(WARRANTY_DATE_FORMAT).to_string(),
        agreement_number: application.agreement_number.clone(),
        client_name: or_missing(client.and_then(|c| c.contacts_buy_name.as_deref())),
        client_phone: or_missing(client.and_then(|c| c.contacts_buy_phones.as_deref())),
        complex_name: or_missing(deal.and_then(|d| d.complex_name.as_deref())),
        house_name: or_missing(deal.and_then(|d| d.house_name.as_deref())),
        entrance: or_missing(deal.and_then(|d| d.geo_house_entrance.as_deref())),
        flat_number: or_missing(deal.and_then(|d| d.geo_flatnum.as_deref())),
        comment: application.comment.clone(),
        defects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn application() -> Application {
        let created = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
        Application {
            id: 5,
            client_id: 10,
            creator_name: None,
            agreement_number: "A-1".into(),
            application_type: "Дефекты".into(),
            comment: "Течет кран".into(),
            status: "В работе".into(),
            responsible_person_id: None,
            source: "Звонок".into(),
            created_at: created,
            due_date: None,
            completed_at: None,
            last_status_change: created,
        }
    }

    #[test]
    fn missing_related_data_reads_as_placeholder() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let context = build_context(&application(), None, None, None, Vec::new(), today);
        assert_eq!(context.responsible_name, "Не назначен");
        assert_eq!(context.today_date, "17.10.2026");
        assert_eq!(context.client_name, MISSING);
        assert_eq!(context.house_name, MISSING);
        assert_eq!(context.request_id, 5);
    }

    #[test]
    fn client_fields_are_copied() {
        let client = Contact {
            id: 10,
            contacts_buy_name: Some("Иванов".into()),
            contacts_buy_phones: Some(" ".into()),
        };
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let context = build_context(&application(), None, Some(&client), None, Vec::new(), today);
        assert_eq!(context.client_name, "Иванов");
        assert_eq!(context.client_phone, MISSING);
    }
}
