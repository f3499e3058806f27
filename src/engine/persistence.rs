//! Serde shapes for checkpoint persistence.
//!
//! Explicit persisted structs decoupled from the in-memory types keep the
//! storage backends lean and declarative: backends serialize
//! [`PersistedCheckpoint`], and the conversions here own the encoding rules
//! (status strings, RFC 3339 timestamps). This module performs no I/O.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::checkpoint::{Checkpoint, RunStatus};
use crate::state::WorkflowState;

/// Full persisted checkpoint representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedCheckpoint {
    pub thread_id: String,
    pub revision: u64,
    /// Status encoded via [`RunStatus::encode`].
    pub status: String,
    pub state: WorkflowState,
    /// RFC 3339 string form of the creation time.
    pub created_at: String,
}

#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("unknown run status encoding: {0}")]
    #[diagnostic(
        code(noteflow::persistence::status),
        help("The checkpoint was written by an incompatible version.")
    )]
    UnknownStatus(String),

    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(code(noteflow::persistence::serde))]
    Serde {
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

impl PersistedCheckpoint {
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| PersistenceError::Serde { source })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|source| PersistenceError::Serde { source })
    }
}

impl From<&Checkpoint> for PersistedCheckpoint {
    fn from(cp: &Checkpoint) -> Self {
        PersistedCheckpoint {
            thread_id: cp.thread_id.clone(),
            revision: cp.revision,
            status: cp.status.encode(),
            state: cp.state.clone(),
            created_at: cp.created_at.to_rfc3339(),
        }
    }
}

impl TryFrom<PersistedCheckpoint> for Checkpoint {
    type Error = PersistenceError;

    fn try_from(p: PersistedCheckpoint) -> Result<Self> {
        let status = RunStatus::decode(&p.status)
            .ok_or_else(|| PersistenceError::UnknownStatus(p.status.clone()))?;
        let created_at = DateTime::parse_from_rfc3339(&p.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Ok(Checkpoint {
            thread_id: p.thread_id,
            revision: p.revision,
            status,
            state: p.state,
            created_at,
        })
    }
}
