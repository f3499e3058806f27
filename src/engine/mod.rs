//! Workflow runtime: execution engine, checkpointing, persistence models.
//!
//! # Architecture
//!
//! - [`WorkflowEngine`]: orchestrates node execution per thread.
//! - [`CheckpointStore`]: trait for pluggable durable persistence.
//! - [`InMemoryCheckpointStore`]: volatile storage for tests and
//!   development.
//! - [`SqliteCheckpointStore`]: durable SQLite-backed persistence
//!   (feature `sqlite`).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use noteflow::engine::{InMemoryCheckpointStore, TurnRequest, WorkflowEngine};
//! # async fn example(graph: noteflow::graph::WorkflowGraph) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryCheckpointStore::new());
//! let engine = WorkflowEngine::new(graph, store);
//!
//! let outcome = engine
//!     .start_turn("thread-1", TurnRequest::new("what is ATP?", "biology"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
#[cfg(feature = "sqlite")]
pub mod checkpoint_sqlite;
pub mod persistence;
pub mod runner;

pub use checkpoint::{
    Checkpoint, CheckpointError, CheckpointStore, InMemoryCheckpointStore, LeaseRegistry,
    RunStatus, ThreadLease,
};
#[cfg(feature = "sqlite")]
pub use checkpoint_sqlite::SqliteCheckpointStore;
pub use persistence::{PersistedCheckpoint, PersistenceError};
pub use runner::{EngineError, RunOutcome, TurnRequest, WorkflowEngine};

use std::sync::Arc;

use crate::config::{CheckpointBackend, RuntimeConfig};

/// Open the checkpoint store selected by the runtime configuration.
pub async fn open_store(
    config: &RuntimeConfig,
) -> Result<Arc<dyn CheckpointStore>, CheckpointError> {
    match config.checkpoint_backend {
        CheckpointBackend::InMemory => Ok(Arc::new(InMemoryCheckpointStore::new())),
        #[cfg(feature = "sqlite")]
        CheckpointBackend::Sqlite => {
            let db_name = config
                .sqlite_db_name
                .clone()
                .unwrap_or_else(|| "noteflow.db".to_string());
            let db_url = format!("sqlite://{db_name}");
            // Ensure the underlying file exists before sqlx connects:
            // strip the scheme, create parent directories, then the file.
            if let Some(path) = db_url.strip_prefix("sqlite://") {
                let path = path.trim();
                if !path.is_empty() {
                    let p = std::path::Path::new(path);
                    if let Some(parent) = p.parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                    if !p.exists() {
                        // Ignore failure; connect reports anything fatal.
                        let _ = std::fs::File::create_new(p);
                    }
                }
            }
            let store = SqliteCheckpointStore::connect(&db_url).await?;
            Ok(Arc::new(store))
        }
    }
}
