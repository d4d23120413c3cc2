// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tiered context assembly for Michimem.
//!
//! Composes token-bounded views of the store: the auto-injected L0
//! overview, L1 search summaries, full L2 records, and the checkpoint
//! restore block.

pub mod tiering;

pub use tiering::{
    build_l0, build_l0_context, build_l1, build_l2, build_restore_context, estimate_tokens,
    render_l1, TieredEntry,
};
