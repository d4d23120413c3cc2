// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Michimem memory system.
//!
//! This crate provides the shared domain types and the error enum used
//! throughout the Michimem workspace. All other crates depend on it.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MichimemError;
pub use types::{
    Checkpoint, Memory, MemoryInput, MemoryPatch, MemoryType, Priority, RankedMemory, StoreStats,
};
