//! Integration tests for application notifications.
//!
//! Each test seeds a small mirror and one application, then runs a single
//! delivery attempt and inspects the resulting `email_logs` row.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use clientdesk_core::application::Defect;
use clientdesk_db::models::application::NewApplication;
use clientdesk_db::models::application_type::CreateApplicationType;
use clientdesk_db::models::responsible_person::CreateResponsiblePerson;
use clientdesk_db::repositories::{ApplicationRepo, ApplicationTypeRepo, ResponsiblePersonRepo};
use clientdesk_events::{
    ApplicationNotifier, EmailError, Mailer, OutgoingEmail, TextTemplateRenderer,
};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<String, EmailError> {
        if self.fail {
            return Err(EmailError::Build("relay refused".into()));
        }
        self.sent.lock().unwrap().push(email);
        Ok("250 OK".into())
    }
}

fn template_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("defects.txt"),
        "Заявка №{{ request_id }}\nКлиент: {{ client_name }}\nДом: {{ house_name }}, кв. {{ flat_number }}\n{{ defects }}\n",
    )
    .unwrap();
    dir
}

async fn seed_mirror(pool: &SqlitePool) {
    for sql in [
        "INSERT INTO estate_houses (house_id, complex_name, name) VALUES (1, 'ЖК Сад', 'Дом 1')",
        "INSERT INTO estate_deals_contacts VALUES (10, 'Иванов', '+998 90 000 00 10')",
        "INSERT INTO estate_sells (estate_sell_id, estate_sell_category, house_id, geo_house_entrance, geo_flatnum)
         VALUES (100, 'flat', 1, '2', '17')",
        "INSERT INTO estate_deals (id, estate_sell_id, agreement_number, contacts_buy_id)
         VALUES (1000, 100, 'A-1', 10)",
    ] {
        sqlx::query(sql).execute(pool).await.unwrap();
    }
}

async fn seed_application(pool: &SqlitePool, template: Option<&str>) -> i64 {
    seed_mirror(pool).await;
    ApplicationTypeRepo::create(
        pool,
        &CreateApplicationType {
            name: "Дефекты".into(),
            template_filename: template.map(String::from),
            has_defect_list: true,
            execution_days: Some(5),
        },
    )
    .await
    .unwrap();
    let person = ResponsiblePersonRepo::create(
        pool,
        &CreateResponsiblePerson {
            full_name: "Петров П.П.".into(),
            email: "petrov@example.com".into(),
            application_types: vec!["Дефекты".into()],
            house_ids: vec![1],
            complex_names: vec![],
        },
    )
    .await
    .unwrap();

    let created_at = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
    ApplicationRepo::create(
        pool,
        &NewApplication {
            client_id: 10,
            creator_name: Some("Оператор".into()),
            agreement_number: "A-1".into(),
            application_type: "Дефекты".into(),
            comment: "Течет кран".into(),
            status: "В работе",
            responsible_person_id: person.id,
            source: "Звонок".into(),
            created_at,
            due_date: None,
            defects: vec![Defect {
                defect_type: "Сантехника".into(),
                description: "Кран на кухне".into(),
            }],
            log_action: "Заявка создана".into(),
            log_comment: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn notifier(pool: &SqlitePool, dir: &TempDir, mailer: Option<Arc<FakeMailer>>) -> ApplicationNotifier {
    ApplicationNotifier::new(
        pool.clone(),
        Arc::new(TextTemplateRenderer::new(dir.path())),
        mailer.map(|m| m as Arc<dyn Mailer>),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_success_sends_rendered_attachment(pool: SqlitePool) {
    let id = seed_application(&pool, Some("defects.txt")).await;
    let mailer = Arc::new(FakeMailer::default());
    let templates = template_dir();
    let service = notifier(&pool, &templates, Some(Arc::clone(&mailer)));

    let log = service.notify(id).await.unwrap();
    assert_eq!(log.status, "Success");
    assert_eq!(log.recipient.as_deref(), Some("petrov@example.com"));
    assert_eq!(log.server_response.as_deref(), Some("250 OK"));

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].attachment_name, format!("Application_{id}.txt"));
    assert_eq!(sent[0].subject, format!("Новая заявка: Дефекты №{id}"));
    let body = String::from_utf8(sent[0].attachment.clone()).unwrap();
    assert!(body.contains("Клиент: Иванов"));
    assert!(body.contains("Дом: Дом 1, кв. 17"));
    assert!(body.contains("1. Сантехника: Кран на кухне"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_type_without_template_is_skipped(pool: SqlitePool) {
    let id = seed_application(&pool, None).await;
    let mailer = Arc::new(FakeMailer::default());
    let templates = template_dir();
    let service = notifier(&pool, &templates, Some(Arc::clone(&mailer)));

    let log = service.notify(id).await.unwrap();
    assert_eq!(log.status, "Skipped");
    assert_eq!(log.recipient.as_deref(), Some("petrov@example.com"));
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unconfigured_smtp_is_skipped(pool: SqlitePool) {
    let id = seed_application(&pool, Some("defects.txt")).await;
    let templates = template_dir();
    let service = notifier(&pool, &templates, None);

    let log = service.notify(id).await.unwrap();
    assert_eq!(log.status, "Skipped");
    assert_eq!(log.server_response.as_deref(), Some("SMTP is not configured"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_template_file_fails(pool: SqlitePool) {
    let id = seed_application(&pool, Some("absent.txt")).await;
    let mailer = Arc::new(FakeMailer::default());
    let templates = template_dir();
    let service = notifier(&pool, &templates, Some(mailer));

    let log = service.notify(id).await.unwrap();
    assert_eq!(log.status, "Failed");
    assert!(log.server_response.unwrap().contains("absent.txt"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_transport_error_is_recorded(pool: SqlitePool) {
    let id = seed_application(&pool, Some("defects.txt")).await;
    let mailer = Arc::new(FakeMailer {
        fail: true,
        ..Default::default()
    });
    let templates = template_dir();
    let service = notifier(&pool, &templates, Some(mailer));

    let log = service.notify(id).await.unwrap();
    assert_eq!(log.status, "Failed");
    assert!(log.server_response.unwrap().contains("relay refused"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_application_is_logged_as_failed(pool: SqlitePool) {
    let templates = template_dir();
    let service = notifier(&pool, &templates, None);
    let log = service.notify(404).await.unwrap();
    assert_eq!(log.status, "Failed");
    assert_eq!(log.application_id, Some(404));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_queue_is_processed_in_background(pool: SqlitePool) {
    let id = seed_application(&pool, Some("defects.txt")).await;
    let mailer = Arc::new(FakeMailer::default());
    let templates = template_dir();
    let service = notifier(&pool, &templates, Some(Arc::clone(&mailer)));

    let (queue, receiver) = ApplicationNotifier::channel(8);
    let worker = tokio::spawn(service.run(receiver, CancellationToken::new()));
    queue.enqueue(id);
    drop(queue);
    worker.await.unwrap();

    assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    let logs = clientdesk_db::repositories::EmailLogRepo::list_for_application(&pool, id)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
}
