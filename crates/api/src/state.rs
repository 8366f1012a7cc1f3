use std::sync::Arc;

use clientdesk_events::NotificationQueue;
use clientdesk_sync::SyncOrchestrator;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: inner data is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: clientdesk_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// `None` when no remote source is configured.
    pub sync: Option<Arc<SyncOrchestrator>>,
    /// Queue of applications awaiting their notification email.
    pub notifications: NotificationQueue,
    /// Cancelled on shutdown; manual sync cycles observe it.
    pub shutdown: CancellationToken,
}
