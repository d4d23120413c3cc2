// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Michimem.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Every field is optional in `config.json` and
//! falls back field-wise to the compiled default.

use std::path::{Path, PathBuf};

use michimem_core::types::{expiry_after_days, Priority};
use serde::{Deserialize, Serialize};

/// Top-level Michimem configuration.
///
/// Loaded from `<data_dir>/config.json` with `MICHIMEM_*` environment
/// variable overrides, deep-merged over compiled defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MichimemConfig {
    /// Root directory for the database, checkpoints, and archive.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Time-to-live settings for non-permanent records.
    #[serde(default)]
    pub ttl: TtlConfig,

    /// Token budgets for the tiered retrieval views.
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Clustering thresholds for the compounding engine.
    #[serde(default)]
    pub compounding: CompoundingConfig,
}

impl Default for MichimemConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ttl: TtlConfig::default(),
            tokens: TokenConfig::default(),
            compounding: CompoundingConfig::default(),
        }
    }
}

impl MichimemConfig {
    /// Path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("index.db")
    }

    /// Directory holding session checkpoints.
    pub fn checkpoints_dir(&self) -> PathBuf {
        self.data_dir.join("checkpoints")
    }

    /// Directory holding archived expired records.
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join("archive")
    }

    /// Reserved per-type export directories, created at boot.
    pub fn memories_dirs(&self) -> Vec<PathBuf> {
        ["diary", "insights", "knowledge", "shared"]
            .iter()
            .map(|t| self.data_dir.join("memories").join(t))
            .collect()
    }

    /// Expiry timestamp implied by a priority under the TTL policy.
    ///
    /// P0 records are permanent and get none; P1 and P2 expire after
    /// `insight_days` and `diary_days` respectively.
    pub fn expiry_for(&self, priority: Priority) -> Option<String> {
        match priority {
            Priority::Permanent => None,
            Priority::Durable => Some(expiry_after_days(self.ttl.insight_days)),
            Priority::Ephemeral => Some(expiry_after_days(self.ttl.diary_days)),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".michimem"))
        .unwrap_or_else(|| Path::new(".michimem").to_path_buf())
}

/// Time-to-live configuration, in days.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TtlConfig {
    /// TTL for diaries (priority 2 records).
    #[serde(default = "default_diary_days")]
    pub diary_days: u32,

    /// TTL for insights (priority 1 records).
    #[serde(default = "default_insight_days")]
    pub insight_days: u32,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            diary_days: default_diary_days(),
            insight_days: default_insight_days(),
        }
    }
}

fn default_diary_days() -> u32 {
    30
}

fn default_insight_days() -> u32 {
    90
}

/// Token budgets for tiered context views.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// Budget for the auto-injected L0 overview.
    #[serde(default = "default_l0_budget")]
    pub l0_budget: usize,

    /// Budget for L1 search summaries.
    #[serde(default = "default_l1_budget")]
    pub l1_budget: usize,

    /// Character budget for the checkpoint context summary.
    #[serde(default = "default_checkpoint_budget")]
    pub checkpoint_budget: usize,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            l0_budget: default_l0_budget(),
            l1_budget: default_l1_budget(),
            checkpoint_budget: default_checkpoint_budget(),
        }
    }
}

fn default_l0_budget() -> usize {
    200
}

fn default_l1_budget() -> usize {
    500
}

fn default_checkpoint_budget() -> usize {
    500
}

/// Cluster-size thresholds for the compounding engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompoundingConfig {
    /// Minimum diary cluster size that yields an insight.
    #[serde(default = "default_diary_threshold")]
    pub diary_threshold: usize,

    /// Minimum insight cluster size that yields a knowledge record.
    #[serde(default = "default_insight_threshold")]
    pub insight_threshold: usize,
}

impl Default for CompoundingConfig {
    fn default() -> Self {
        Self {
            diary_threshold: default_diary_threshold(),
            insight_threshold: default_insight_threshold(),
        }
    }
}

fn default_diary_threshold() -> usize {
    5
}

fn default_insight_threshold() -> usize {
    3
}
