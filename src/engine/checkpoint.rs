//! Durable, thread-keyed checkpoint storage.
//!
//! A [`Checkpoint`] is a snapshot of [`WorkflowState`] taken at a node
//! boundary, chained per thread by a strictly increasing revision number.
//! Stores enforce the revision sequence: saving revision `n` requires the
//! thread to currently sit at `n - 1`, so two writers racing on the same
//! thread produce a loud [`CheckpointError::Conflict`], never a silent
//! merge. In-process callers additionally serialize whole runs through the
//! [`LeaseRegistry`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::state::WorkflowState;
use crate::types::NodeKind;

/// Where a thread's most recent run stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Mid-run; `next` is the node the engine will execute next.
    InProgress { next: NodeKind },
    /// Parked at the consent gate; the only status a resume accepts.
    AwaitingConsent,
    /// The run reached a terminal node.
    Completed,
}

impl RunStatus {
    /// Encode into the persisted string form.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            RunStatus::InProgress { next } => format!("InProgress:{}", next.encode()),
            RunStatus::AwaitingConsent => "AwaitingConsent".to_string(),
            RunStatus::Completed => "Completed".to_string(),
        }
    }

    /// Decode a persisted string form.
    #[must_use]
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "AwaitingConsent" => Some(RunStatus::AwaitingConsent),
            "Completed" => Some(RunStatus::Completed),
            other => {
                let next = NodeKind::decode(other.strip_prefix("InProgress:")?)?;
                Some(RunStatus::InProgress { next })
            }
        }
    }
}

/// A durable snapshot of workflow state at a node boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub thread_id: String,
    /// Strictly increasing, starting at 1 for the first save on a thread.
    pub revision: u64,
    pub status: RunStatus,
    pub state: WorkflowState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(
        thread_id: impl Into<String>,
        revision: u64,
        status: RunStatus,
        state: WorkflowState,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            revision,
            status,
            state,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointError {
    /// The revision sequence was violated: a concurrent writer got there
    /// first. Never resolved by picking a side.
    #[error(
        "checkpoint conflict on thread {thread_id}: tried to save revision {attempted}, \
         thread is at {current}"
    )]
    #[diagnostic(
        code(noteflow::checkpoint::conflict),
        help("Reload the thread's latest checkpoint and retry from it.")
    )]
    Conflict {
        thread_id: String,
        attempted: u64,
        current: u64,
    },

    #[error("checkpoint backend error: {message}")]
    #[diagnostic(code(noteflow::checkpoint::backend))]
    Backend { message: String },

    #[error("checkpoint error: {message}")]
    #[diagnostic(code(noteflow::checkpoint::other))]
    Other { message: String },
}

pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Durable, thread-keyed persistence of workflow state.
///
/// `save` must reject any checkpoint whose revision is not exactly one past
/// the thread's current revision. A save must be durable before the caller
/// observes any effect of the step it recorded (write-then-yield).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a new revision for its thread.
    async fn save(&self, checkpoint: Checkpoint) -> Result<()>;

    /// The most recent checkpoint for a thread, if any.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Known thread ids.
    async fn list_threads(&self) -> Result<Vec<String>>;
}

/// Volatile store for tests and development. Keeps the full revision chain
/// per thread.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    chains: Mutex<FxHashMap<String, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Full revision chain for a thread, oldest first. Test helper.
    #[must_use]
    pub fn chain(&self, thread_id: &str) -> Vec<Checkpoint> {
        self.chains
            .lock()
            .expect("checkpoint chains poisoned")
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut chains = self.chains.lock().expect("checkpoint chains poisoned");
        let chain = chains.entry(checkpoint.thread_id.clone()).or_default();
        let current = chain.last().map_or(0, |cp| cp.revision);
        if checkpoint.revision != current + 1 {
            return Err(CheckpointError::Conflict {
                thread_id: checkpoint.thread_id,
                attempted: checkpoint.revision,
                current,
            });
        }
        chain.push(checkpoint);
        Ok(())
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let chains = self.chains.lock().expect("checkpoint chains poisoned");
        Ok(chains.get(thread_id).and_then(|chain| chain.last().cloned()))
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let chains = self.chains.lock().expect("checkpoint chains poisoned");
        let mut ids: Vec<String> = chains.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// In-process exclusive access per thread id.
///
/// A run holds its thread's lease from before the first checkpoint read
/// until after the last write; a second caller trying to run the same
/// thread concurrently is turned away instead of being interleaved.
#[derive(Debug, Default)]
pub struct LeaseRegistry {
    held: Mutex<FxHashSet<String>>,
}

impl LeaseRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire the lease for `thread_id`, or `None` if a run already holds
    /// it. Released when the returned guard drops.
    #[must_use]
    pub fn acquire(self: &Arc<Self>, thread_id: &str) -> Option<ThreadLease> {
        let mut held = self.held.lock().expect("lease registry poisoned");
        if !held.insert(thread_id.to_string()) {
            return None;
        }
        Some(ThreadLease {
            registry: Arc::clone(self),
            thread_id: thread_id.to_string(),
        })
    }
}

/// RAII guard for a thread lease.
#[derive(Debug)]
pub struct ThreadLease {
    registry: Arc<LeaseRegistry>,
    thread_id: String,
}

impl Drop for ThreadLease {
    fn drop(&mut self) {
        self.registry
            .held
            .lock()
            .expect("lease registry poisoned")
            .remove(&self.thread_id);
    }
}
