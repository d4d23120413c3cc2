// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle and compounding engine for Michimem.
//!
//! Evolves the store over time: expired records are archived to markdown
//! and dropped, recurring diaries are clustered into insights, and
//! recurring insights are promoted into permanent knowledge.

pub mod cluster;
pub mod compounding;
pub mod lifecycle;

pub use cluster::{group_by_overlap, overlap, word_set, OVERLAP_THRESHOLD};
pub use compounding::{run_compounding, synthesize_cluster, CompoundingReport};
pub use lifecycle::{render_archive, run_lifecycle, LifecycleReport};
