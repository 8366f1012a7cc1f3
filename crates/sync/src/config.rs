use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sqlx::mysql::MySqlConnectOptions;

use crate::error::SyncError;

/// Rows per chunk when `SYNC_CHUNK_SIZE` is unset.
pub const DEFAULT_CHUNK_SIZE: u64 = 100_000;
pub const DEFAULT_INTERVAL_HOURS: u64 = 4;
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 300;

/// Sync engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote source; `None` disables synchronization.
    pub source: Option<SourceConfig>,
    pub chunk_size: u64,
    pub interval: Duration,
    /// Upper bound on a single remote query.
    pub remote_timeout: Duration,
    /// Run one cycle before the HTTP listener binds.
    pub run_on_startup: bool,
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default  |
    /// |----------------------------|----------|
    /// | `SYNC_CHUNK_SIZE`          | `100000` |
    /// | `SYNC_INTERVAL_HOURS`      | `4`      |
    /// | `SYNC_REMOTE_TIMEOUT_SECS` | `300`    |
    /// | `SYNC_ON_STARTUP`          | `true`   |
    ///
    /// The source is read by [`SourceConfig::from_env`].
    pub fn from_env() -> Result<Self, SyncError> {
        let chunk_size: u64 = parse_var("SYNC_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        if chunk_size == 0 {
            return Err(SyncError::Config("SYNC_CHUNK_SIZE must be positive".into()));
        }
        let interval_hours: u64 = parse_var("SYNC_INTERVAL_HOURS", DEFAULT_INTERVAL_HOURS)?;
        if interval_hours == 0 {
            return Err(SyncError::Config(
                "SYNC_INTERVAL_HOURS must be positive".into(),
            ));
        }
        let remote_timeout_secs: u64 =
            parse_var("SYNC_REMOTE_TIMEOUT_SECS", DEFAULT_REMOTE_TIMEOUT_SECS)?;

        Ok(Self {
            source: SourceConfig::from_env()?,
            chunk_size,
            interval: Duration::from_secs(interval_hours * 3600),
            remote_timeout: Duration::from_secs(remote_timeout_secs),
            run_on_startup: parse_var("SYNC_ON_STARTUP", true)?,
        })
    }
}

/// Connection settings of the remote MySQL database.
#[derive(Clone)]
pub enum SourceConfig {
    /// Full connection URL (`SOURCE_DATABASE_URL`).
    Url(String),
    /// Individual settings (`SOURCE_MYSQL_*`).
    Parts {
        host: String,
        port: u16,
        database: String,
        user: String,
        password: Option<String>,
    },
}

impl SourceConfig {
    /// Read the remote source from the environment.
    ///
    /// `SOURCE_DATABASE_URL` wins when set. Otherwise `SOURCE_MYSQL_DATABASE`
    /// and `SOURCE_MYSQL_USER` are required; `SOURCE_MYSQL_HOST` defaults to
    /// `localhost` and `SOURCE_MYSQL_PORT` to `3306`. Returns `None` when the
    /// source is not configured.
    pub fn from_env() -> Result<Option<Self>, SyncError> {
        Self::from_vars(non_empty_var)
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, SyncError> {
        if let Some(url) = var("SOURCE_DATABASE_URL") {
            return Ok(Some(SourceConfig::Url(url)));
        }
        let (Some(database), Some(user)) = (var("SOURCE_MYSQL_DATABASE"), var("SOURCE_MYSQL_USER"))
        else {
            return Ok(None);
        };
        Ok(Some(SourceConfig::Parts {
            host: var("SOURCE_MYSQL_HOST").unwrap_or_else(|| "localhost".into()),
            port: parse_value("SOURCE_MYSQL_PORT", var("SOURCE_MYSQL_PORT"), 3306)?,
            database,
            user,
            password: var("SOURCE_MYSQL_PASSWORD"),
        }))
    }

    pub fn connect_options(&self) -> Result<MySqlConnectOptions, SyncError> {
        match self {
            SourceConfig::Url(url) => MySqlConnectOptions::from_str(url)
                .map_err(|e| SyncError::Config(format!("Invalid SOURCE_DATABASE_URL: {e}"))),
            SourceConfig::Parts {
                host,
                port,
                database,
                user,
                password,
            } => {
                let mut options = MySqlConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .database(database)
                    .username(user)
                    .charset("utf8mb4");
                if let Some(password) = password {
                    options = options.password(password);
                }
                Ok(options)
            }
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceConfig::Url(_) => f.write_str("SourceConfig::Url(..)"),
            SourceConfig::Parts {
                host,
                port,
                database,
                user,
                ..
            } => f
                .debug_struct("SourceConfig::Parts")
                .field("host", host)
                .field("port", port)
                .field("database", database)
                .field("user", user)
                .finish_non_exhaustive(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, SyncError> {
    parse_value(name, non_empty_var(name), default)
}

fn parse_value<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, SyncError> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| SyncError::Config(format!("{name} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}
