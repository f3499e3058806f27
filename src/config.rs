//! Runtime configuration resolved from the environment.

use std::path::PathBuf;

use crate::llm::ProviderSettings;

/// Which checkpoint backend to open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointBackend {
    /// Volatile, per-process. Suspended threads do not survive restarts.
    InMemory,
    /// Durable SQLite database.
    #[cfg(feature = "sqlite")]
    Sqlite,
}

/// Process-level configuration for the engine and its collaborators.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Root directory for the filesystem note store.
    pub data_dir: PathBuf,
    pub checkpoint_backend: CheckpointBackend,
    /// Database file name for the SQLite backend.
    pub sqlite_db_name: Option<String>,
    /// Language-model provider credentials.
    pub providers: ProviderSettings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            checkpoint_backend: CheckpointBackend::InMemory,
            sqlite_db_name: Some("noteflow.db".to_string()),
            providers: ProviderSettings::default(),
        }
    }
}

impl RuntimeConfig {
    /// Resolve configuration from the environment (and a `.env` file when
    /// present).
    ///
    /// Variables:
    /// - `NOTEFLOW_DATA_DIR`: note store root, default `data`
    /// - `NOTEFLOW_CHECKPOINTS`: `sqlite` or `memory`, default `sqlite`
    ///   when the feature is compiled in
    /// - `SQLITE_DB_NAME`: database file name, default `noteflow.db`
    /// - `ANTHROPIC_API_KEY` / `OPENAI_API_KEY`: provider credentials
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let data_dir = std::env::var("NOTEFLOW_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let backend_var = std::env::var("NOTEFLOW_CHECKPOINTS").unwrap_or_default();
        let checkpoint_backend = resolve_backend(&backend_var);

        let sqlite_db_name =
            Some(std::env::var("SQLITE_DB_NAME").unwrap_or_else(|_| "noteflow.db".to_string()));

        Self {
            data_dir,
            checkpoint_backend,
            sqlite_db_name,
            providers: ProviderSettings::from_env(),
        }
    }

    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_backend(mut self, backend: CheckpointBackend) -> Self {
        self.checkpoint_backend = backend;
        self
    }

    /// Generate a fresh thread id for a new conversation.
    #[must_use]
    pub fn generate_thread_id() -> String {
        format!("thread-{}", uuid::Uuid::new_v4())
    }
}

#[cfg(feature = "sqlite")]
fn resolve_backend(var: &str) -> CheckpointBackend {
    match var {
        "memory" => CheckpointBackend::InMemory,
        _ => CheckpointBackend::Sqlite,
    }
}

#[cfg(not(feature = "sqlite"))]
fn resolve_backend(_var: &str) -> CheckpointBackend {
    CheckpointBackend::InMemory
}
