// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session extraction: derive candidate memory records from a transcript.
//!
//! Produces up to one diary (the session trace), plus knowledge records for
//! user corrections and stated preferences. Extraction is deterministic
//! given the transcript, and best-effort: an unreadable transcript yields
//! an empty result.

use std::path::Path;

use michimem_config::MichimemConfig;
use michimem_core::types::expiry_after_days;
use michimem_core::{MemoryInput, MemoryType, Priority};

use crate::patterns::{
    collapse_newlines, context_window, detect_file_paths, truncate_chars, CORRECTION_PATTERNS,
    PREFERENCE_PATTERNS, TOPIC_ACTIVITY, TOPIC_COMPONENT,
};
use crate::transcript::{read_transcript, Transcript};

/// Messages inspected for topics.
const TOPIC_MESSAGE_WINDOW: usize = 10;
/// Topics kept per diary.
const TOPIC_CAP: usize = 5;
/// Messages rendered into the diary content.
const DIARY_MESSAGE_WINDOW: usize = 20;
/// Per-message text clip in the diary rendering.
const DIARY_TEXT_CLIP: usize = 200;
/// File references kept per diary.
const FILE_CAP: usize = 10;
/// Minimum message count for a diary to be worth keeping.
const DIARY_MIN_MESSAGES: usize = 4;

/// The three extraction streams of a session.
#[derive(Debug, Default)]
pub struct SessionExtraction {
    /// The session diary, present iff the transcript has enough messages.
    pub diary: Option<MemoryInput>,
    /// Knowledge records for user corrections, tagged `correction`.
    pub corrections: Vec<MemoryInput>,
    /// Knowledge records for stated preferences, tagged `preference`.
    pub preferences: Vec<MemoryInput>,
}

/// Extract all streams from a transcript file.
pub fn extract_session(transcript_path: &Path, config: &MichimemConfig) -> SessionExtraction {
    let transcript = read_transcript(transcript_path);
    extract_from_transcript(&transcript, config)
}

/// Extract all streams from an already-parsed transcript.
pub fn extract_from_transcript(
    transcript: &Transcript,
    config: &MichimemConfig,
) -> SessionExtraction {
    SessionExtraction {
        diary: build_diary(transcript, config),
        corrections: extract_corrections(transcript),
        preferences: extract_preferences(transcript),
    }
}

/// Build the session diary: one ephemeral record summarizing the session.
///
/// Deterministic given the transcript (the date-stamped title fallback and
/// the expiry aside).
pub fn build_diary(transcript: &Transcript, config: &MichimemConfig) -> Option<MemoryInput> {
    let messages = &transcript.messages;
    if messages.len() < DIARY_MIN_MESSAGES {
        return None;
    }

    let first_user_text = messages
        .iter()
        .find(|m| m.is_user())
        .map(|m| collapse_newlines(&m.text()))
        .unwrap_or_default();
    let title = if first_user_text.is_empty() {
        format!("Session: {}", chrono::Utc::now().format("%Y-%m-%d"))
    } else {
        format!("Session: {}", truncate_chars(&first_user_text, 100))
    };

    let topics = extract_topics(transcript);

    let user_count = messages.iter().filter(|m| m.is_user()).count();
    let assistant_count = messages.iter().filter(|m| m.is_assistant()).count();
    let mut summary = format!("{user_count} user msgs, {assistant_count} assistant msgs.");
    if !topics.is_empty() {
        summary.push_str(&format!(" Topics: {}", topics.join(", ")));
    }

    let rendered: Vec<String> = messages
        .iter()
        .filter(|m| m.is_user() || m.is_assistant())
        .rev()
        .take(DIARY_MESSAGE_WINDOW)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|m| {
            let label = if m.is_user() { "**User**" } else { "**Assistant**" };
            format!("{label}: {}", truncate_chars(&m.text(), DIARY_TEXT_CLIP))
        })
        .collect();
    let mut content = rendered.join("\n\n");

    let files = detect_file_paths(&transcript.raw, FILE_CAP);
    if !files.is_empty() {
        content.push_str(&format!("\n\nFiles referenced: {}", files.join(", ")));
    }

    Some(MemoryInput {
        memory_type: MemoryType::Diary,
        priority: Priority::Ephemeral,
        title,
        summary,
        content,
        tags: topics,
        expires_at: Some(expiry_after_days(config.ttl.diary_days)),
        ..Default::default()
    })
}

/// Topics from the first messages: gerund phrases and "the X module" style
/// component names, lowercased, deduplicated, capped.
fn extract_topics(transcript: &Transcript) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for message in transcript.messages.iter().take(TOPIC_MESSAGE_WINDOW) {
        let text = message.text();
        for caps in TOPIC_ACTIVITY.captures_iter(&text) {
            if let Some(m) = caps.get(2) {
                push_topic(&mut topics, m.as_str().trim().to_lowercase());
            }
        }
        for caps in TOPIC_COMPONENT.captures_iter(&text) {
            if let (Some(name), Some(kind)) = (caps.get(2), caps.get(3)) {
                push_topic(
                    &mut topics,
                    format!("{} {}", name.as_str(), kind.as_str()).to_lowercase(),
                );
            }
        }
    }
    topics
}

fn push_topic(topics: &mut Vec<String>, topic: String) {
    if topics.len() < TOPIC_CAP && !topic.is_empty() && !topics.contains(&topic) {
        topics.push(topic);
    }
}

/// Corrective statements from user messages.
fn extract_corrections(transcript: &Transcript) -> Vec<MemoryInput> {
    let mut out = Vec::new();
    for message in transcript.messages.iter().filter(|m| m.is_user()) {
        let text = message.text();
        for (pattern, subtype) in CORRECTION_PATTERNS.iter() {
            for caps in pattern.captures_iter(&text) {
                let m = caps.get(0).expect("group 0 always present");
                let matched = m.as_str().trim();
                out.push(MemoryInput {
                    memory_type: MemoryType::Knowledge,
                    priority: Priority::Permanent,
                    title: format!("Correction: {}", truncate_chars(matched, 60)),
                    summary: truncate_chars(matched, 150),
                    content: context_window(&text, m.start(), m.end(), 100)
                        .trim()
                        .to_string(),
                    tags: vec!["correction".to_string(), (*subtype).to_string()],
                    ..Default::default()
                });
            }
        }
    }
    dedup_by_title(out)
}

/// Stated preferences from user messages.
fn extract_preferences(transcript: &Transcript) -> Vec<MemoryInput> {
    let mut out = Vec::new();
    for message in transcript.messages.iter().filter(|m| m.is_user()) {
        let text = message.text();
        for pattern in PREFERENCE_PATTERNS.iter() {
            for caps in pattern.captures_iter(&text) {
                let m = caps.get(0).expect("group 0 always present");
                let matched = m.as_str().trim();
                out.push(MemoryInput {
                    memory_type: MemoryType::Knowledge,
                    priority: Priority::Permanent,
                    title: format!("Preference: {}", truncate_chars(matched, 60)),
                    summary: truncate_chars(matched, 150),
                    content: context_window(&text, m.start(), m.end(), 100)
                        .trim()
                        .to_string(),
                    tags: vec!["preference".to_string()],
                    ..Default::default()
                });
            }
        }
    }
    dedup_by_title(out)
}

/// Drop candidates whose title differs only by case from an earlier one.
fn dedup_by_title(candidates: Vec<MemoryInput>) -> Vec<MemoryInput> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for candidate in candidates {
        let key = candidate.title.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(candidate);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptMessage;
    use michimem_config::load_config_from_str;

    fn message(role: &str, text: &str) -> String {
        serde_json::json!({"role": role, "content": text}).to_string()
    }

    fn transcript_of(lines: Vec<String>) -> Transcript {
        let raw = lines.join("\n");
        let messages = raw
            .lines()
            .filter_map(|l| serde_json::from_str::<TranscriptMessage>(l).ok())
            .collect();
        Transcript { raw, messages }
    }

    fn config() -> MichimemConfig {
        load_config_from_str("{}").unwrap()
    }

    fn basic_session() -> Transcript {
        transcript_of(vec![
            message("user", "help me with fixing deployment scripts in the auth module"),
            message("assistant", "Sure, let's look at src/deploy.sh first."),
            message("user", "actually, the deploy config lives in infra/deploy.yaml"),
            message("assistant", "Got it, updating infra/deploy.yaml."),
        ])
    }

    #[test]
    fn no_diary_below_four_messages() {
        let transcript = transcript_of(vec![
            message("user", "hi"),
            message("assistant", "hello"),
            message("user", "bye"),
        ]);
        assert!(build_diary(&transcript, &config()).is_none());
    }

    #[test]
    fn diary_title_from_first_user_message() {
        let diary = build_diary(&basic_session(), &config()).unwrap();
        assert_eq!(
            diary.title,
            "Session: help me with fixing deployment scripts in the auth module"
        );
        assert_eq!(diary.memory_type, MemoryType::Diary);
        assert_eq!(diary.priority, Priority::Ephemeral);
        assert!(diary.expires_at.is_some());
    }

    #[test]
    fn diary_title_clips_to_100_chars_and_collapses_newlines() {
        let long = format!("first\nline {}", "x".repeat(200));
        let transcript = transcript_of(vec![
            message("user", &long),
            message("assistant", "a"),
            message("user", "b"),
            message("assistant", "c"),
        ]);
        let diary = build_diary(&transcript, &config()).unwrap();
        assert!(diary.title.starts_with("Session: first line x"));
        assert_eq!(diary.title.chars().count(), "Session: ".chars().count() + 100);
    }

    #[test]
    fn diary_title_falls_back_to_date_when_no_user_text() {
        let transcript = transcript_of(vec![
            message("assistant", "a"),
            message("assistant", "b"),
            message("assistant", "c"),
            message("assistant", "d"),
        ]);
        let diary = build_diary(&transcript, &config()).unwrap();
        // "Session: YYYY-MM-DD"
        assert_eq!(diary.title.len(), "Session: ".len() + 10);
    }

    #[test]
    fn diary_summary_counts_and_topics() {
        let diary = build_diary(&basic_session(), &config()).unwrap();
        assert!(diary.summary.starts_with("2 user msgs, 2 assistant msgs."));
        assert!(diary.summary.contains("Topics: "), "summary: {}", diary.summary);
        assert!(diary.summary.contains("auth module"), "summary: {}", diary.summary);
        assert_eq!(diary.tags.len(), 2, "tags: {:?}", diary.tags);
        assert!(diary.tags.contains(&"auth module".to_string()));
    }

    #[test]
    fn diary_content_renders_roles_and_files() {
        let diary = build_diary(&basic_session(), &config()).unwrap();
        assert!(diary.content.contains("**User**: help me"));
        assert!(diary.content.contains("**Assistant**: Sure"));
        assert!(diary.content.contains("Files referenced: "));
        assert!(diary.content.contains("src/deploy.sh"));
        assert!(diary.content.contains("infra/deploy.yaml"));
    }

    #[test]
    fn diary_content_keeps_last_twenty_messages_clipped() {
        let mut lines = Vec::new();
        for i in 0..30 {
            lines.push(message("user", &format!("message number {i} {}", "y".repeat(300))));
        }
        let diary = build_diary(&transcript_of(lines), &config()).unwrap();
        assert!(!diary.content.contains("message number 9 "));
        assert!(diary.content.contains("message number 10 "));
        assert!(diary.content.contains("message number 29 "));
        // Each rendered line is clipped to 200 chars of text.
        for line in diary.content.split("\n\n") {
            assert!(line.chars().count() <= "**User**: ".chars().count() + 200);
        }
    }

    #[test]
    fn corrections_extracted_from_user_text_only() {
        let transcript = transcript_of(vec![
            message("user", "actually, the tests must run against postgres"),
            message(
                "assistant",
                "actually, the tests must run against postgres",
            ),
        ]);
        let corrections = extract_corrections(&transcript);
        assert_eq!(corrections.len(), 1);
        let c = &corrections[0];
        assert!(c.title.starts_with("Correction: actually, the tests"));
        assert_eq!(c.memory_type, MemoryType::Knowledge);
        assert_eq!(c.priority, Priority::Permanent);
        assert_eq!(c.tags, vec!["correction", "general"]);
        assert!(c.expires_at.is_none());
    }

    #[test]
    fn prohibition_corrections_get_their_subtype() {
        let transcript = transcript_of(vec![message(
            "user",
            "please don't restart the database in place",
        )]);
        let corrections = extract_corrections(&transcript);
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].tags, vec!["correction", "prohibition"]);
    }

    #[test]
    fn corrections_dedup_case_insensitively() {
        let transcript = transcript_of(vec![
            message("user", "Wrong the staging URL is app.staging.example"),
            message("user", "wrong THE STAGING URL IS APP.STAGING.EXAMPLE"),
        ]);
        let corrections = extract_corrections(&transcript);
        assert_eq!(corrections.len(), 1, "{:?}", corrections);
    }

    #[test]
    fn preferences_extracted_and_tagged() {
        let transcript = transcript_of(vec![message(
            "user",
            "I prefer tabs over spaces and my preferred shell is fish for everything",
        )]);
        let preferences = extract_preferences(&transcript);
        assert_eq!(preferences.len(), 2, "{:?}", preferences);
        for p in &preferences {
            assert!(p.title.starts_with("Preference: "));
            assert_eq!(p.tags, vec!["preference"]);
            assert_eq!(p.priority, Priority::Permanent);
        }
    }

    #[test]
    fn empty_transcript_yields_empty_extraction() {
        let extraction =
            extract_session(Path::new("/nonexistent/t.jsonl"), &config());
        assert!(extraction.diary.is_none());
        assert!(extraction.corrections.is_empty());
        assert!(extraction.preferences.is_empty());
    }

    #[test]
    fn topics_capped_at_five() {
        let mut lines = vec![message(
            "user",
            "working on alpha one, building beta two, fixing gamma three, debugging delta four",
        )];
        lines.push(message(
            "user",
            "implementing epsilon five, creating zeta six, the auth module",
        ));
        lines.push(message("assistant", "ok"));
        lines.push(message("assistant", "ok"));
        let diary = build_diary(&transcript_of(lines), &config()).unwrap();
        assert!(diary.tags.len() <= 5, "tags: {:?}", diary.tags);
    }
}
