// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-delimited transcript parsing.
//!
//! A transcript is one JSON message per line: `{role, content, type?}`.
//! `content` is either a plain string or an ordered list of content blocks;
//! only `text` blocks contribute text. Extraction is best-effort: read
//! errors and unparseable lines yield an empty transcript, never an error.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

/// One message of a transcript.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptMessage {
    pub role: String,
    #[serde(default)]
    pub content: MessageContent,
}

impl TranscriptMessage {
    /// The message's text: the string content, or the concatenation of its
    /// `text` blocks.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Other => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == "user"
    }

    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }
}

/// Message content: a plain string or a list of blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

/// A single content block. Only `text` blocks carry extractable text;
/// everything else (tool use, images, ...) is opaque.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

/// A parsed transcript plus its raw text (file-reference detection scans
/// the JSON-stringified form).
#[derive(Debug, Default)]
pub struct Transcript {
    pub raw: String,
    pub messages: Vec<TranscriptMessage>,
}

/// Read and parse a transcript file.
///
/// Soft failure: an unreadable file yields an empty transcript, and lines
/// that do not parse as messages are skipped.
pub fn read_transcript(path: &Path) -> Transcript {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "transcript unreadable");
            return Transcript::default();
        }
    };

    let messages = raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<TranscriptMessage>(line).ok())
        .collect();

    Transcript { raw, messages }
}
