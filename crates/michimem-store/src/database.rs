// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. The `Database` struct IS the single writer: one process may hold
//! it open for writes while other processes read. Do NOT create additional
//! Connection instances for writes.

use std::path::Path;

use michimem_core::MichimemError;
use tokio_rusqlite::Connection;

use crate::schema::SCHEMA;

/// Convert tokio-rusqlite errors into the storage error variant.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> MichimemError {
    MichimemError::Storage {
        source: Box::new(e),
    }
}

/// A single SQLite connection with the Michimem schema applied.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (and create if absent) the database at `path`.
    ///
    /// Enables write-ahead logging and foreign-key enforcement, then
    /// applies the idempotent schema batch.
    pub async fn open(path: &Path) -> Result<Self, MichimemError> {
        let conn = Connection::open(path).await.map_err(map_tr_err)?;
        initialize(&conn).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory database. Used by tests.
    pub async fn open_in_memory() -> Result<Self, MichimemError> {
        let conn = Connection::open_in_memory().await.map_err(map_tr_err)?;
        initialize(&conn).await?;
        Ok(Self { conn })
    }

    /// The underlying connection. Query code calls through `conn.call()`.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Flush the WAL before the process exits.
    pub async fn close(&self) -> Result<(), MichimemError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

async fn initialize(conn: &Connection) -> Result<(), MichimemError> {
    conn.call(|conn| {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    })
    .await
    .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_schema() {
        let db = Database::open_in_memory().await.unwrap();
        let tables: Vec<String> = db
            .connection()
            .call(|conn| {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap();
        assert!(tables.iter().any(|t| t == "memories"));
        assert!(tables.iter().any(|t| t == "metrics"));
        assert!(tables.iter().any(|t| t == "memories_fts"));
    }

    #[tokio::test]
    async fn open_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        {
            let db = Database::open(&path).await.unwrap();
            db.close().await.unwrap();
        }
        // Reopening against an existing file must not fail.
        let db = Database::open(&path).await.unwrap();
        db.close().await.unwrap();
    }
}
