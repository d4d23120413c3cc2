// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database schema: the `memories` table, its contentless FTS5 index with
//! sync triggers, and the append-only `metrics` table.
//!
//! The FTS index mirrors title, summary, content, and tags. The three
//! triggers keep it coherent with the primary table on every insert,
//! update, and delete, so index maintenance is atomic with the row change.

/// Schema batch applied on every open. All statements are idempotent.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memories (
    id          TEXT PRIMARY KEY NOT NULL,
    type        TEXT NOT NULL,
    priority    INTEGER NOT NULL DEFAULT 1,
    title       TEXT NOT NULL,
    summary     TEXT NOT NULL DEFAULT '',
    content     TEXT NOT NULL DEFAULT '',
    tags        TEXT NOT NULL DEFAULT '[]',
    agent_id    TEXT NOT NULL DEFAULT '',
    source_ids  TEXT NOT NULL DEFAULT '[]',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    expires_at  TEXT
);

CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(type);
CREATE INDEX IF NOT EXISTS idx_memories_priority ON memories(priority);
CREATE INDEX IF NOT EXISTS idx_memories_expires ON memories(expires_at);
CREATE INDEX IF NOT EXISTS idx_memories_updated ON memories(updated_at);

CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    title,
    summary,
    content,
    tags,
    id UNINDEXED,
    content=''
);

CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts(rowid, title, summary, content, tags, id)
    VALUES (new.rowid, new.title, new.summary, new.content, new.tags, new.id);
END;

CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, title, summary, content, tags, id)
    VALUES ('delete', old.rowid, old.title, old.summary, old.content, old.tags, old.id);
END;

CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, title, summary, content, tags, id)
    VALUES ('delete', old.rowid, old.title, old.summary, old.content, old.tags, old.id);
    INSERT INTO memories_fts(rowid, title, summary, content, tags, id)
    VALUES (new.rowid, new.title, new.summary, new.content, new.tags, new.id);
END;

CREATE TABLE IF NOT EXISTS metrics (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    event       TEXT NOT NULL,
    data        TEXT NOT NULL DEFAULT '{}',
    created_at  TEXT NOT NULL
);
";
