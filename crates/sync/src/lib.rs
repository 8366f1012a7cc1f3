//! Mirror synchronization engine.
//!
//! Replaces the full contents of the four mirrored tables (houses, contacts,
//! sells, deals) with the current state of the remote operational database.
//! A cycle clears every mirrored table in one transaction, then streams each
//! table parent-to-child in fixed-size chunks, committing once per table.
//!
//! - [`source`]: paged, ordered reads from the remote MySQL database.
//! - [`store`]: transactional clear and chunked loads into the local store.
//! - [`orchestrator`]: the cycle itself, its state and its report.
//! - [`scheduler`]: the periodic task that drives cycles.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod scheduler;
pub mod source;
pub mod store;

pub use config::{SourceConfig, SyncConfig};
pub use error::{SourceError, StoreError, SyncError};
pub use orchestrator::{SyncOrchestrator, SyncOutcome, SyncReport, SyncState, SyncStatus, TableReport};
pub use scheduler::{run_detached, SyncScheduler};
pub use source::{MirrorSource, MySqlSource};
pub use store::{MirrorStore, SqliteMirrorStore, TableLoad};
