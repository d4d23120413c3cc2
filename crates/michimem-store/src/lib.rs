// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed indexed memory store for Michimem.
//!
//! One table of memory records, a trigger-maintained FTS5 index over
//! title/summary/content/tags, and an append-only metric log. Write-ahead
//! logging is enabled; a single writer process with concurrent readers is
//! the supported concurrency model.

pub mod database;
pub mod schema;
pub mod store;

pub use database::Database;
pub use store::MemoryStore;
