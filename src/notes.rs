//! Note storage collaborator.
//!
//! The engine consumes note files through the narrow [`NoteStore`] trait;
//! ranking and retrieval policy live in the search node, not here.
//! [`FsNoteStore`] is the production implementation: projects are
//! subdirectories of a data root, notes are markdown files inside them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use thiserror::Error;

/// A note file as returned by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteFile {
    /// Full file content.
    pub content: String,
    /// Store-relative path.
    pub path: String,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
}

/// Errors from the note storage layer.
#[derive(Debug, Error, Diagnostic)]
pub enum NoteStoreError {
    #[error("project not found: {project_id}")]
    #[diagnostic(code(noteflow::notes::project_not_found))]
    ProjectNotFound { project_id: String },

    /// A single file could not be read. Skippable per file by callers.
    #[error("cannot read file {file_id}: {reason}")]
    #[diagnostic(code(noteflow::notes::file_unreadable))]
    FileUnreadable { file_id: String, reason: String },

    #[error("note store backend error: {message}")]
    #[diagnostic(code(noteflow::notes::backend))]
    Backend { message: String },
}

/// Enumeration and retrieval of note files, scoped by project.
///
/// `list_files` returns file ids in a stable order; that order is the
/// tie-break for equal-relevance search results, so implementations must
/// keep it deterministic.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Ordered ids of the note files visible under `project_id`.
    async fn list_files(&self, project_id: &str) -> Result<Vec<String>, NoteStoreError>;

    /// Read a single note file.
    async fn read_file(&self, project_id: &str, file_id: &str)
        -> Result<NoteFile, NoteStoreError>;
}

/// Directory-backed note store.
///
/// Layout: `<root>/<project_id>/<file_id>.md`. Dot-directories are not
/// projects; reads resolving outside the root are rejected.
#[derive(Clone, Debug)]
pub struct FsNoteStore {
    root: PathBuf,
}

impl FsNoteStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project_id: &str) -> Result<PathBuf, NoteStoreError> {
        if project_id.is_empty() || project_id.starts_with('.') {
            return Err(NoteStoreError::ProjectNotFound {
                project_id: project_id.to_string(),
            });
        }
        let dir = self.root.join(project_id);
        // Confine resolution to the data root before touching the directory.
        let canonical_root =
            self.root
                .canonicalize()
                .map_err(|e| NoteStoreError::Backend {
                    message: format!("data root unavailable: {e}"),
                })?;
        let canonical = dir
            .canonicalize()
            .map_err(|_| NoteStoreError::ProjectNotFound {
                project_id: project_id.to_string(),
            })?;
        if !canonical.starts_with(&canonical_root) || !canonical.is_dir() {
            return Err(NoteStoreError::ProjectNotFound {
                project_id: project_id.to_string(),
            });
        }
        Ok(canonical)
    }
}

#[async_trait]
impl NoteStore for FsNoteStore {
    async fn list_files(&self, project_id: &str) -> Result<Vec<String>, NoteStoreError> {
        let dir = self.project_dir(project_id)?;
        let entries = std::fs::read_dir(&dir).map_err(|e| NoteStoreError::Backend {
            message: format!("cannot enumerate {}: {e}", dir.display()),
        })?;

        let mut file_ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| NoteStoreError::Backend {
                message: e.to_string(),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                file_ids.push(stem.to_string());
            }
        }
        // Directory order is platform-dependent; sort for a stable
        // enumeration order.
        file_ids.sort();
        Ok(file_ids)
    }

    async fn read_file(
        &self,
        project_id: &str,
        file_id: &str,
    ) -> Result<NoteFile, NoteStoreError> {
        let dir = self.project_dir(project_id)?;
        let path = dir.join(format!("{file_id}.md"));
        let canonical = path
            .canonicalize()
            .map_err(|e| NoteStoreError::FileUnreadable {
                file_id: file_id.to_string(),
                reason: e.to_string(),
            })?;
        if !canonical.starts_with(&dir) {
            return Err(NoteStoreError::FileUnreadable {
                file_id: file_id.to_string(),
                reason: "path resolves outside the data root".to_string(),
            });
        }

        let content =
            std::fs::read_to_string(&canonical).map_err(|e| NoteStoreError::FileUnreadable {
                file_id: file_id.to_string(),
                reason: e.to_string(),
            })?;
        let modified_at = std::fs::metadata(&canonical)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let relative = canonical
            .strip_prefix(&self.root.canonicalize().unwrap_or_else(|_| self.root.clone()))
            .unwrap_or(&canonical);
        Ok(NoteFile {
            content,
            path: relative.display().to_string(),
            modified_at,
        })
    }
}
