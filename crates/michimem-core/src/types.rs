// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types for the memory system.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Timestamp format used everywhere: ISO 8601 UTC with millisecond precision.
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time as an ISO 8601 string.
pub fn now_iso() -> String {
    chrono::Utc::now().format(ISO_FORMAT).to_string()
}

/// Current UTC time as epoch milliseconds (checkpoint filename suffix).
pub fn epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// ISO 8601 timestamp `days` days from now. Used to compute TTL expiries.
pub fn expiry_after_days(days: u32) -> String {
    (chrono::Utc::now() + chrono::Duration::days(i64::from(days)))
        .format(ISO_FORMAT)
        .to_string()
}

/// The kind of a memory record.
///
/// Types and priorities are independent dimensions, but conventions tie
/// them: diaries are ephemeral (P2), insights durable (P1), knowledge and
/// shared records permanent (P0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// Raw per-session trace, synthesized from a transcript.
    Diary,
    /// Pattern synthesized from clustered diaries.
    Insight,
    /// Long-lived fact: user corrections, preferences, promoted insights.
    Knowledge,
    /// Cross-agent shared record.
    Shared,
}

impl MemoryType {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Diary => "diary",
            MemoryType::Insight => "insight",
            MemoryType::Knowledge => "knowledge",
            MemoryType::Shared => "shared",
        }
    }

    /// Parse from SQLite string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "diary" => MemoryType::Diary,
            "insight" => MemoryType::Insight,
            "shared" => MemoryType::Shared,
            _ => MemoryType::Knowledge,
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retention priority of a memory record.
///
/// P0 records never expire; P1 and P2 carry a TTL (90 and 30 days by
/// default, both config-tunable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// P0: permanent.
    Permanent,
    /// P1: expires after `ttl.insight_days`.
    Durable,
    /// P2: expires after `ttl.diary_days`.
    Ephemeral,
}

impl Priority {
    /// Integer value as stored in SQLite and on the wire.
    pub fn value(&self) -> i64 {
        match self {
            Priority::Permanent => 0,
            Priority::Durable => 1,
            Priority::Ephemeral => 2,
        }
    }

    /// Parse from the stored integer. Out-of-range values fall back to P1.
    pub fn from_value(v: i64) -> Self {
        match v {
            0 => Priority::Permanent,
            2 => Priority::Ephemeral,
            _ => Priority::Durable,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.value())
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.value())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = i64::deserialize(deserializer)?;
        Ok(Priority::from_value(v))
    }
}

/// A persistent memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Globally unique opaque identifier (UUID v4).
    pub id: String,
    /// Record kind.
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Retention priority.
    pub priority: Priority,
    /// Title; dedup key (case-insensitive) within a type.
    pub title: String,
    /// One-paragraph summary.
    pub summary: String,
    /// Full freeform content.
    pub content: String,
    /// Short lowercase tag strings.
    pub tags: Vec<String>,
    /// Owning agent; empty for the default agent.
    pub agent_id: String,
    /// Parent memory ids; non-empty iff synthesized by compounding.
    /// Dangling references are tolerated.
    pub source_ids: Vec<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    pub updated_at: String,
    /// ISO 8601 expiry, present iff the record has finite TTL.
    pub expires_at: Option<String>,
}

/// Payload for inserting a new memory. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryInput {
    pub memory_type: MemoryType,
    pub priority: Priority,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub tags: Vec<String>,
    pub agent_id: String,
    pub source_ids: Vec<String>,
    pub expires_at: Option<String>,
}

impl Default for MemoryInput {
    fn default() -> Self {
        Self {
            memory_type: MemoryType::Insight,
            priority: Priority::Durable,
            title: String::new(),
            summary: String::new(),
            content: String::new(),
            tags: Vec::new(),
            agent_id: String::new(),
            source_ids: Vec::new(),
            expires_at: None,
        }
    }
}

/// Partial update for an existing memory.
///
/// `expires_at` is doubly optional: `None` leaves the column untouched,
/// `Some(None)` clears it, `Some(Some(ts))` sets it. Changing `priority`
/// does not recompute `expires_at`.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
    pub expires_at: Option<Option<String>>,
}

impl MemoryPatch {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.summary.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.priority.is_none()
            && self.expires_at.is_none()
    }
}

/// A memory with its full-text search rank.
///
/// The rank is opaque and comparable only within a single search.
#[derive(Debug, Clone)]
pub struct RankedMemory {
    pub memory: Memory,
    pub rank: f64,
}

/// Aggregate counts over the store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub total: i64,
    pub by_type: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
    pub expired: i64,
}

/// A session-resume snapshot captured before context compaction.
///
/// Written once, never mutated; read back at session start when the
/// session resumed from a compaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    pub timestamp: String,
    /// Most recent non-trivial user utterance, truncated.
    pub current_task: String,
    /// Up to 5 recent assistant-side decision fragments.
    pub decisions: Vec<String>,
    /// Up to 10 file paths referenced across the transcript.
    pub files_modified: Vec<String>,
    /// Up to 5 recent user-side corrective statements.
    pub corrections: Vec<String>,
    /// Concatenation of the last ~10 messages, character-budgeted.
    pub context_summary: String,
}
