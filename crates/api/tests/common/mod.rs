#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use clientdesk_api::config::{LogFormat, ServerConfig};
use clientdesk_api::router::build_app_router;
use clientdesk_api::state::AppState;
use clientdesk_core::mirror::{MirrorRow, MirrorTable, TableSpec};
use clientdesk_events::ApplicationNotifier;
use clientdesk_sync::{MirrorSource, SourceError, SqliteMirrorStore, SyncOrchestrator};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: "sqlite::memory:".to_string(),
        template_dir: std::env::temp_dir(),
        log_format: LogFormat::Pretty,
    }
}

/// Build the full application router on `pool` with sync disabled.
///
/// The notification queue has no consumer, so queued notifications are
/// dropped.
pub fn build_test_app(pool: SqlitePool) -> Router {
    build_app(pool, None)
}

pub fn build_app(pool: SqlitePool, sync: Option<Arc<SyncOrchestrator>>) -> Router {
    let config = test_config();
    let (notifications, _receiver) = ApplicationNotifier::channel(16);
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        sync,
        notifications,
        shutdown: CancellationToken::new(),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Remote source
// ---------------------------------------------------------------------------

/// A remote source serving fixed rows per table, all in the first chunk.
#[derive(Default)]
pub struct StaticSource {
    rows: HashMap<MirrorTable, Vec<MirrorRow>>,
}

impl StaticSource {
    pub fn with_rows(mut self, table: MirrorTable, rows: Vec<MirrorRow>) -> Self {
        self.rows.insert(table, rows);
        self
    }
}

#[async_trait]
impl MirrorSource for StaticSource {
    async fn connect(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn fetch_chunk(
        &self,
        spec: &'static TableSpec,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<MirrorRow>, SourceError> {
        let rows = self.rows.get(&spec.table).cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

pub fn orchestrator(pool: &SqlitePool, source: StaticSource) -> Arc<SyncOrchestrator> {
    Arc::new(SyncOrchestrator::new(
        Arc::new(source),
        Arc::new(SqliteMirrorStore::new(pool.clone())),
        100,
    ))
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// One house, one client with one deal on one apartment.
pub async fn seed_mirror(pool: &SqlitePool) {
    for sql in [
        "INSERT INTO estate_houses (house_id, complex_name, name) VALUES (1, 'ЖК Сад', 'Дом 1')",
        "INSERT INTO estate_deals_contacts VALUES (10, 'Иванов Иван', '+998 90 000 00 10')",
        "INSERT INTO estate_sells (estate_sell_id, estate_sell_category, house_id, geo_house_entrance, geo_flatnum)
         VALUES (100, 'flat', 1, '2', '17')",
        "INSERT INTO estate_deals (id, estate_sell_id, agreement_number, contacts_buy_id, deal_status_name)
         VALUES (1000, 100, 'A-1', 10, 'Сделка проведена')",
    ] {
        sqlx::query(sql).execute(pool).await.unwrap();
    }
}

pub async fn create_responsible(app: Router, types: &[&str], houses: &[i64]) -> i64 {
    let response = post_json(
        app,
        "/api/v1/responsible-persons",
        serde_json::json!({
            "full_name": "Петров П.П.",
            "email": "petrov@example.com",
            "application_types": types,
            "house_ids": houses,
        }),
    )
    .await;
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
