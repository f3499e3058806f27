/*!
SQLite checkpoint store.

Durable [`CheckpointStore`] implementation over sqlx. Each thread keeps its
full revision chain in `checkpoints`, with the current revision denormalized
into `threads` for cheap latest-lookup and for the optimistic concurrency
check.

## Behavior

- Serialization goes through the persistence models
  (`PersistedCheckpoint`), never ad-hoc JSON.
- `save` runs in a transaction: the thread's current revision must equal
  `revision - 1`, and the `(thread_id, revision)` insert must be new;
  either violation maps to [`CheckpointError::Conflict`]. Concurrent
  writers lose loudly, they are never merged.
- The schema is bootstrapped with `CREATE TABLE IF NOT EXISTS` on connect;
  there is no external migration step to orchestrate for a two-table
  schema.

## Storage growth

The full chain is retained per thread; plan periodic cleanup for
long-running deployments, e.g.:

```bash
sqlite3 noteflow.db "DELETE FROM checkpoints WHERE created_at < datetime('now', '-30 days')"
sqlite3 noteflow.db "VACUUM"
```
*/

use std::sync::Arc;

use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::engine::checkpoint::{Checkpoint, CheckpointError, CheckpointStore, Result};
use crate::engine::persistence::PersistedCheckpoint;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS threads (
    id         TEXT PRIMARY KEY,
    revision   INTEGER NOT NULL,
    status     TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id  TEXT NOT NULL,
    revision   INTEGER NOT NULL,
    status     TEXT NOT NULL,
    state_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (thread_id, revision)
);
"#;

/// SQLite-backed checkpoint store.
pub struct SqliteCheckpointStore {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteCheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCheckpointStore").finish()
    }
}

impl SqliteCheckpointStore {
    /// Connect (or create) a SQLite database at `database_url`.
    /// Example URL: `"sqlite://noteflow.db"`.
    #[must_use = "store must be used to persist state"]
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| CheckpointError::Backend {
                message: format!("connect error: {e}"),
            })?;
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| CheckpointError::Backend {
                message: format!("schema bootstrap: {e}"),
            })?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait::async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    #[instrument(skip(self, checkpoint), err)]
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let persisted = PersistedCheckpoint::from(&checkpoint);
        let state_json = persisted
            .to_json_string()
            .map_err(|e| CheckpointError::Other {
                message: format!("state serialize: {e}"),
            })?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CheckpointError::Backend {
                message: format!("tx begin: {e}"),
            })?;

        let current: Option<i64> = sqlx::query_scalar("SELECT revision FROM threads WHERE id = ?1")
            .bind(&checkpoint.thread_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| CheckpointError::Backend {
                message: format!("revision check: {e}"),
            })?;
        let current = current.unwrap_or(0) as u64;
        if checkpoint.revision != current + 1 {
            return Err(CheckpointError::Conflict {
                thread_id: checkpoint.thread_id,
                attempted: checkpoint.revision,
                current,
            });
        }

        // Duplicate (thread_id, revision) means another writer won the race
        // between our check and this insert.
        let inserted = sqlx::query(
            r#"
            INSERT INTO checkpoints (thread_id, revision, status, state_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&checkpoint.thread_id)
        .bind(checkpoint.revision as i64)
        .bind(&persisted.status)
        .bind(&state_json)
        .bind(&persisted.created_at)
        .execute(&mut *tx)
        .await;
        if let Err(e) = inserted {
            let conflicting = matches!(
                &e,
                sqlx::Error::Database(db) if db.is_unique_violation()
            );
            if conflicting {
                return Err(CheckpointError::Conflict {
                    thread_id: checkpoint.thread_id,
                    attempted: checkpoint.revision,
                    current,
                });
            }
            return Err(CheckpointError::Backend {
                message: format!("insert checkpoint: {e}"),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO threads (id, revision, status, updated_at)
            VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            ON CONFLICT(id) DO UPDATE SET
                revision = excluded.revision,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&checkpoint.thread_id)
        .bind(checkpoint.revision as i64)
        .bind(&persisted.status)
        .execute(&mut *tx)
        .await
        .map_err(|e| CheckpointError::Backend {
            message: format!("update thread: {e}"),
        })?;

        tx.commit().await.map_err(|e| CheckpointError::Backend {
            message: format!("tx commit: {e}"),
        })?;

        Ok(())
    }

    #[instrument(skip(self, thread_id), err)]
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            r#"
            SELECT state_json FROM checkpoints
            WHERE thread_id = ?1
            ORDER BY revision DESC
            LIMIT 1
            "#,
        )
        .bind(thread_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| CheckpointError::Backend {
            message: format!("select latest: {e}"),
        })?;

        let Some(row) = row else {
            return Ok(None);
        };
        let state_json: String = row.get("state_json");
        let persisted =
            PersistedCheckpoint::from_json_str(&state_json).map_err(|e| CheckpointError::Other {
                message: format!("state parse: {e}"),
            })?;
        let checkpoint = Checkpoint::try_from(persisted).map_err(|e| CheckpointError::Other {
            message: format!("state convert: {e}"),
        })?;
        Ok(Some(checkpoint))
    }

    #[instrument(skip(self), err)]
    async fn list_threads(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM threads ORDER BY updated_at DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| CheckpointError::Backend {
                message: format!("list threads: {e}"),
            })?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("id")).collect())
    }
}
