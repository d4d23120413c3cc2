// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Michimem memory system.

use thiserror::Error;

/// The primary error type used across all Michimem crates.
#[derive(Debug, Error)]
pub enum MichimemError {
    /// Configuration errors (invalid JSON, unknown fields, bad paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, index corruption).
    ///
    /// Storage invariant violations are fatal; callers are not expected
    /// to recover from this variant.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Filesystem errors carrying the offending path.
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Tool protocol framing errors (malformed request, bad params).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Lookup of a memory id that does not exist.
    #[error("memory not found: {0}")]
    NotFound(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
