// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The memory store: durable persistence of memories and metrics with a
//! coherent full-text index.
//!
//! FTS coherence is enforced by database triggers, so every insert, update,
//! and delete is atomically mirrored into `memories_fts`. Metric writes are
//! fire-and-forget and never fail the caller.

use std::collections::BTreeMap;
use std::path::Path;

use michimem_core::types::now_iso;
use michimem_core::{
    Memory, MemoryInput, MemoryPatch, MemoryType, MichimemError, Priority, RankedMemory,
    StoreStats,
};
use rusqlite::{params, OptionalExtension};
use tracing::warn;
use uuid::Uuid;

use crate::database::{map_tr_err, Database};

/// Column list matching [`row_to_memory`]. Keep the two in sync.
const MEMORY_COLUMNS: &str =
    "id, type, priority, title, summary, content, tags, agent_id, source_ids, \
     created_at, updated_at, expires_at";

/// Persistent store for memories in SQLite.
///
/// Owns the database handle; all other components borrow the store for the
/// duration of a call.
pub struct MemoryStore {
    db: Database,
}

impl MemoryStore {
    /// Open the store at `path`, creating the schema if needed.
    pub async fn open(path: &Path) -> Result<Self, MichimemError> {
        Ok(Self {
            db: Database::open(path).await?,
        })
    }

    /// Open an in-memory store. Used by tests.
    pub async fn open_in_memory() -> Result<Self, MichimemError> {
        Ok(Self {
            db: Database::open_in_memory().await?,
        })
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Flush the WAL. Called on every dispatcher exit path.
    pub async fn close(&self) -> Result<(), MichimemError> {
        self.db.close().await
    }

    /// Insert a new memory, assigning its id and timestamps.
    pub async fn insert(&self, input: MemoryInput) -> Result<Memory, MichimemError> {
        let now = now_iso();
        let memory = Memory {
            id: Uuid::new_v4().to_string(),
            memory_type: input.memory_type,
            priority: input.priority,
            title: input.title,
            summary: input.summary,
            content: input.content,
            tags: input.tags,
            agent_id: input.agent_id,
            source_ids: input.source_ids,
            created_at: now.clone(),
            updated_at: now,
            expires_at: input.expires_at,
        };

        let row = memory.clone();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO memories (id, type, priority, title, summary, content, tags, \
                     agent_id, source_ids, created_at, updated_at, expires_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        row.id,
                        row.memory_type.as_str(),
                        row.priority.value(),
                        row.title,
                        row.summary,
                        row.content,
                        serde_json::to_string(&row.tags).unwrap_or_else(|_| "[]".into()),
                        row.agent_id,
                        serde_json::to_string(&row.source_ids).unwrap_or_else(|_| "[]".into()),
                        row.created_at,
                        row.updated_at,
                        row.expires_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        Ok(memory)
    }

    /// Exact lookup by id.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Memory>, MichimemError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1");
                let mut stmt = conn.prepare(&sql)?;
                let memory = stmt.query_row(params![id], row_to_memory).optional()?;
                Ok(memory)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Case-insensitive title lookup within a type.
    ///
    /// Titles are the dedup key for extracted records and `mem_store`
    /// upserts.
    pub async fn get_by_title(
        &self,
        title: &str,
        memory_type: MemoryType,
    ) -> Result<Option<Memory>, MichimemError> {
        let title = title.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let sql = format!(
                    "SELECT {MEMORY_COLUMNS} FROM memories \
                     WHERE lower(title) = lower(?1) AND type = ?2 LIMIT 1"
                );
                let mut stmt = conn.prepare(&sql)?;
                let memory = stmt
                    .query_row(params![title, memory_type.as_str()], row_to_memory)
                    .optional()?;
                Ok(memory)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Full-text search over title, summary, content, and tags.
    ///
    /// `query` uses the native FTS5 expression language. Results come back
    /// best-first (rank ascending); the rank is opaque and comparable only
    /// within one search.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RankedMemory>, MichimemError> {
        let query = query.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let sql = format!(
                    "SELECT m.id, m.type, m.priority, m.title, m.summary, m.content, m.tags, \
                     m.agent_id, m.source_ids, m.created_at, m.updated_at, m.expires_at, rank \
                     FROM memories_fts JOIN memories m ON m.rowid = memories_fts.rowid \
                     WHERE memories_fts MATCH ?1 ORDER BY rank LIMIT ?2"
                );
                let mut stmt = conn.prepare(&sql)?;
                let results = stmt
                    .query_map(params![query, limit as i64], |row| {
                        Ok(RankedMemory {
                            memory: row_to_memory(row)?,
                            rank: row.get(12)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(results)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Records of one type, most recently updated first.
    pub async fn get_by_type(
        &self,
        memory_type: MemoryType,
        limit: usize,
    ) -> Result<Vec<Memory>, MichimemError> {
        self.db
            .connection()
            .call(move |conn| {
                let sql = format!(
                    "SELECT {MEMORY_COLUMNS} FROM memories WHERE type = ?1 \
                     ORDER BY updated_at DESC LIMIT ?2"
                );
                let mut stmt = conn.prepare(&sql)?;
                let memories = stmt
                    .query_map(params![memory_type.as_str(), limit as i64], row_to_memory)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(memories)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Records of one priority, most recently updated first.
    pub async fn get_by_priority(
        &self,
        priority: Priority,
        limit: usize,
    ) -> Result<Vec<Memory>, MichimemError> {
        self.db
            .connection()
            .call(move |conn| {
                let sql = format!(
                    "SELECT {MEMORY_COLUMNS} FROM memories WHERE priority = ?1 \
                     ORDER BY updated_at DESC LIMIT ?2"
                );
                let mut stmt = conn.prepare(&sql)?;
                let memories = stmt
                    .query_map(params![priority.value(), limit as i64], row_to_memory)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(memories)
            })
            .await
            .map_err(map_tr_err)
    }

    /// All records whose expiry lies in the past.
    pub async fn get_expired(&self) -> Result<Vec<Memory>, MichimemError> {
        let now = now_iso();
        self.db
            .connection()
            .call(move |conn| {
                let sql = format!(
                    "SELECT {MEMORY_COLUMNS} FROM memories \
                     WHERE expires_at IS NOT NULL AND expires_at < ?1 \
                     ORDER BY expires_at ASC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let memories = stmt
                    .query_map(params![now], row_to_memory)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(memories)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Diaries not yet consumed by any insight, oldest first.
    ///
    /// A diary counts as consumed when its id appears in some insight's
    /// `source_ids`. Knowledge `source_ids` are deliberately not consulted:
    /// a diary whose consuming insight has itself expired can resurface.
    pub async fn get_unprocessed_diaries(
        &self,
        limit: usize,
    ) -> Result<Vec<Memory>, MichimemError> {
        self.db
            .connection()
            .call(move |conn| {
                let sql = format!(
                    "SELECT {cols} FROM memories d WHERE d.type = 'diary' AND NOT EXISTS ( \
                       SELECT 1 FROM memories i, json_each(i.source_ids) src \
                       WHERE i.type = 'insight' AND src.value = d.id) \
                     ORDER BY d.created_at ASC LIMIT ?1",
                    cols = MEMORY_COLUMNS
                        .split(", ")
                        .map(|c| format!("d.{c}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                let mut stmt = conn.prepare(&sql)?;
                let memories = stmt
                    .query_map(params![limit as i64], row_to_memory)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(memories)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Partial update. Touches `updated_at` and reindexes via triggers.
    ///
    /// Returns whether a row changed. Changing `priority` does not
    /// recompute `expires_at`.
    pub async fn update(&self, id: &str, patch: MemoryPatch) -> Result<bool, MichimemError> {
        if patch.is_empty() {
            return Ok(false);
        }
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let mut sets: Vec<&str> = Vec::new();
                let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

                if let Some(title) = patch.title {
                    sets.push("title = ?");
                    values.push(Box::new(title));
                }
                if let Some(summary) = patch.summary {
                    sets.push("summary = ?");
                    values.push(Box::new(summary));
                }
                if let Some(content) = patch.content {
                    sets.push("content = ?");
                    values.push(Box::new(content));
                }
                if let Some(tags) = patch.tags {
                    sets.push("tags = ?");
                    values.push(Box::new(
                        serde_json::to_string(&tags).unwrap_or_else(|_| "[]".into()),
                    ));
                }
                if let Some(priority) = patch.priority {
                    sets.push("priority = ?");
                    values.push(Box::new(priority.value()));
                }
                if let Some(expires_at) = patch.expires_at {
                    sets.push("expires_at = ?");
                    values.push(Box::new(expires_at));
                }
                sets.push("updated_at = ?");
                values.push(Box::new(now_iso()));
                values.push(Box::new(id));

                let sql = format!(
                    "UPDATE memories SET {} WHERE id = ?",
                    sets.join(", ")
                );
                let changed = conn.execute(
                    &sql,
                    rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Remove a record and its index entry. Returns whether a row existed.
    pub async fn delete(&self, id: &str) -> Result<bool, MichimemError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let changed = conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
                Ok(changed > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Aggregate counts: total, per type, per priority, expired.
    pub async fn stats(&self) -> Result<StoreStats, MichimemError> {
        let now = now_iso();
        self.db
            .connection()
            .call(move |conn| {
                let total: i64 =
                    conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;

                let mut by_type = BTreeMap::new();
                let mut stmt =
                    conn.prepare("SELECT type, COUNT(*) FROM memories GROUP BY type")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                for row in rows {
                    let (t, n) = row?;
                    by_type.insert(t, n);
                }

                let mut by_priority = BTreeMap::new();
                let mut stmt =
                    conn.prepare("SELECT priority, COUNT(*) FROM memories GROUP BY priority")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })?;
                for row in rows {
                    let (p, n) = row?;
                    by_priority.insert(p.to_string(), n);
                }

                let expired: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM memories WHERE expires_at IS NOT NULL AND expires_at < ?1",
                    params![now],
                    |row| row.get(0),
                )?;

                Ok(StoreStats {
                    total,
                    by_type,
                    by_priority,
                    expired,
                })
            })
            .await
            .map_err(map_tr_err)
    }

    /// Append a metric observation. Never fails the caller: failures are
    /// logged and swallowed.
    pub async fn record_metric(&self, event: &str, data: serde_json::Value) {
        let event = event.to_string();
        let payload = data.to_string();
        let result = self
            .db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO metrics (event, data, created_at) VALUES (?1, ?2, ?3)",
                    params![event, payload, now_iso()],
                )?;
                Ok(())
            })
            .await;
        if let Err(e) = result {
            warn!(error = %e, "failed to record metric");
        }
    }
}

/// Convert a rusqlite row (in [`MEMORY_COLUMNS`] order) to a Memory.
fn row_to_memory(row: &rusqlite::Row) -> Result<Memory, rusqlite::Error> {
    let type_str: String = row.get(1)?;
    let priority: i64 = row.get(2)?;
    let tags_json: String = row.get(6)?;
    let source_ids_json: String = row.get(8)?;

    Ok(Memory {
        id: row.get(0)?,
        memory_type: MemoryType::from_str_value(&type_str),
        priority: Priority::from_value(priority),
        title: row.get(3)?,
        summary: row.get(4)?,
        content: row.get(5)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        agent_id: row.get(7)?,
        source_ids: serde_json::from_str(&source_ids_json).unwrap_or_default(),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        expires_at: row.get(11)?,
    })
}
