// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session checkpointing: snapshot resume state before context compaction.
//!
//! One JSON file per snapshot under `checkpoints/`, named
//! `<session_id>-<epoch_ms>.json`. The millisecond suffix is monotonic per
//! session, so lexicographic filename order is creation order. Snapshots
//! are never mutated and never deleted by this system.

use std::path::Path;

use michimem_config::MichimemConfig;
use michimem_core::types::{epoch_ms, now_iso};
use michimem_core::{Checkpoint, MichimemError};
use tracing::debug;

use crate::patterns::{
    truncate_chars, detect_file_paths, CHECKPOINT_CORRECTION_PATTERNS, DECISION_PATTERNS,
};
use crate::transcript::{read_transcript, Transcript};

/// Cap on decision fragments.
const DECISION_CAP: usize = 5;
/// Cap on file references.
const FILE_CAP: usize = 10;
/// Cap on corrective statements.
const CORRECTION_CAP: usize = 5;
/// Messages folded into the context summary.
const SUMMARY_MESSAGE_WINDOW: usize = 10;
/// Clip for the current-task utterance.
const TASK_CLIP: usize = 200;
/// Minimum length for a user utterance to count as the current task.
const TASK_MIN_CHARS: usize = 10;

/// Build and persist a checkpoint for a session.
///
/// Returns `None` (no checkpoint) when the transcript cannot be parsed or
/// holds no messages; storage errors writing the snapshot are real errors.
pub fn create_checkpoint(
    session_id: &str,
    transcript_path: &Path,
    config: &MichimemConfig,
) -> Result<Option<Checkpoint>, MichimemError> {
    let transcript = read_transcript(transcript_path);
    if transcript.messages.is_empty() {
        return Ok(None);
    }

    let checkpoint = build_checkpoint(session_id, &transcript, config);

    let dir = config.checkpoints_dir();
    std::fs::create_dir_all(&dir).map_err(|e| MichimemError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;
    let path = dir.join(format!("{session_id}-{}.json", epoch_ms()));
    let json = serde_json::to_string_pretty(&checkpoint)
        .map_err(|e| MichimemError::Internal(format!("checkpoint serialization: {e}")))?;
    std::fs::write(&path, json).map_err(|e| MichimemError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    debug!(path = %path.display(), "checkpoint written");

    Ok(Some(checkpoint))
}

/// Assemble the checkpoint entity from a parsed transcript.
pub fn build_checkpoint(
    session_id: &str,
    transcript: &Transcript,
    config: &MichimemConfig,
) -> Checkpoint {
    let messages = &transcript.messages;

    let current_task = messages
        .iter()
        .rev()
        .filter(|m| m.is_user())
        .map(|m| m.text().trim().to_string())
        .find(|text| text.chars().count() >= TASK_MIN_CHARS)
        .map(|text| truncate_chars(&text, TASK_CLIP))
        .unwrap_or_default();

    let mut decisions = Vec::new();
    for message in messages.iter().filter(|m| m.is_assistant()) {
        let text = message.text();
        for pattern in DECISION_PATTERNS.iter() {
            for caps in pattern.captures_iter(&text) {
                if let Some(m) = caps.get(2) {
                    decisions.push(m.as_str().trim().to_string());
                }
            }
        }
    }
    let decisions = keep_last(decisions, DECISION_CAP);

    let mut corrections = Vec::new();
    for message in messages.iter().filter(|m| m.is_user()) {
        let text = message.text();
        for pattern in CHECKPOINT_CORRECTION_PATTERNS.iter() {
            for caps in pattern.captures_iter(&text) {
                if let Some(m) = caps.get(2) {
                    corrections.push(m.as_str().trim().to_string());
                }
            }
        }
    }
    let corrections = keep_last(corrections, CORRECTION_CAP);

    let recent: Vec<String> = messages
        .iter()
        .rev()
        .take(SUMMARY_MESSAGE_WINDOW)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|m| format!("{}: {}", m.role, m.text()))
        .collect();
    let context_summary = truncate_chars(&recent.join("\n"), config.tokens.checkpoint_budget);

    Checkpoint {
        session_id: session_id.to_string(),
        timestamp: now_iso(),
        current_task,
        decisions,
        files_modified: detect_file_paths(&transcript.raw, FILE_CAP),
        corrections,
        context_summary,
    }
}

/// Latest checkpoint for a session, or `None` when absent.
///
/// Scans filenames with the session prefix in descending lexicographic
/// order and returns the first one that parses.
pub fn latest_checkpoint(session_id: &str, config: &MichimemConfig) -> Option<Checkpoint> {
    let dir = config.checkpoints_dir();
    let prefix = format!("{session_id}-");

    let mut names: Vec<String> = std::fs::read_dir(&dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(&prefix) && name.ends_with(".json"))
        .collect();
    names.sort();
    names.reverse();

    for name in names {
        let path = dir.join(&name);
        if let Ok(contents) = std::fs::read_to_string(&path) {
            if let Ok(checkpoint) = serde_json::from_str::<Checkpoint>(&contents) {
                return Some(checkpoint);
            }
        }
        debug!(path = %path.display(), "skipping unreadable checkpoint");
    }
    None
}

/// The most recent `cap` entries, original order preserved.
fn keep_last(items: Vec<String>, cap: usize) -> Vec<String> {
    let skip = items.len().saturating_sub(cap);
    items.into_iter().skip(skip).collect()
}
