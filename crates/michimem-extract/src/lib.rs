// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript extraction for Michimem.
//!
//! Turns raw line-delimited session transcripts into candidate memory
//! records (diary, corrections, preferences) and session-resume
//! checkpoints. All extraction is regex-based and best-effort: failures
//! yield empty output, never errors.

pub mod checkpoint;
pub mod extractor;
pub mod patterns;
pub mod transcript;

pub use checkpoint::{build_checkpoint, create_checkpoint, latest_checkpoint};
pub use extractor::{build_diary, extract_from_transcript, extract_session, SessionExtraction};
pub use transcript::{read_transcript, ContentBlock, MessageContent, Transcript, TranscriptMessage};
