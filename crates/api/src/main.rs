use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clientdesk_api::config::{LogFormat, ServerConfig};
use clientdesk_api::router::build_app_router;
use clientdesk_api::state::AppState;
use clientdesk_events::{
    ApplicationNotifier, EmailConfig, EmailDelivery, Mailer, TextTemplateRenderer,
};
use clientdesk_sync::{
    MySqlSource, SqliteMirrorStore, SyncConfig, SyncOrchestrator, SyncScheduler,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pending notifications held in memory before new ones are dropped.
const NOTIFICATION_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    let sync_config = SyncConfig::from_env()?;

    // --- Tracing ---
    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "clientdesk_api=debug,clientdesk_sync=info,clientdesk_events=info,tower_http=debug"
                    .into()
            }),
        )
        .with(pretty)
        .with(json)
        .init();

    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    ensure_database_dir(&config.database_url).await?;
    let pool = clientdesk_db::create_pool(&config.database_url)
        .await
        .context("Failed to open the local database")?;
    clientdesk_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let shutdown = CancellationToken::new();

    // --- Mirror sync ---
    let mut background = Vec::new();
    let sync = match &sync_config.source {
        Some(source) => {
            let source = MySqlSource::new(source, sync_config.remote_timeout)?;
            let store = SqliteMirrorStore::new(pool.clone());
            let orchestrator = Arc::new(SyncOrchestrator::new(
                Arc::new(source),
                Arc::new(store),
                sync_config.chunk_size,
            ));

            if sync_config.run_on_startup {
                tracing::info!("Running initial sync cycle");
                // The server starts on whatever the local store holds.
                clientdesk_sync::run_detached(&orchestrator, &shutdown).await;
            }

            let scheduler = SyncScheduler::new(Arc::clone(&orchestrator), sync_config.interval);
            background.push(tokio::spawn(scheduler.run(shutdown.clone())));
            Some(orchestrator)
        }
        None => {
            tracing::warn!("Remote source is not configured, mirror sync disabled");
            None
        }
    };

    // --- Notifications ---
    let mailer = EmailConfig::from_env().map(|c| Arc::new(EmailDelivery::new(c)) as Arc<dyn Mailer>);
    if mailer.is_none() {
        tracing::warn!("SMTP_HOST is not set, notification emails will be skipped");
    }
    let notifier = ApplicationNotifier::new(
        pool.clone(),
        Arc::new(TextTemplateRenderer::new(config.template_dir.clone())),
        mailer,
    );
    let (notifications, receiver) = ApplicationNotifier::channel(NOTIFICATION_QUEUE_CAPACITY);
    background.push(tokio::spawn(notifier.run(receiver, shutdown.clone())));

    // --- Router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        sync,
        notifications,
        shutdown: shutdown.clone(),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    shutdown.cancel();
    for handle in background {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Create the directory of a file-backed SQLite database if missing.
async fn ensure_database_dir(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
