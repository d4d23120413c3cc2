// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The authoritative regex catalogs for transcript extraction, plus shared
//! text helpers.
//!
//! Every scan uses `find_iter`/`captures_iter`, which always starts at
//! position zero; no cursor state leaks between invocations.

use std::sync::LazyLock;

use regex::Regex;

/// Correction patterns applied to user-role text, with the tag subtype each
/// family produces.
pub static CORRECTION_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)(actually|no,\s*|wrong|instead|correction)[,:]?\s+(.{15,150})")
                .unwrap(),
            "general",
        ),
        (
            Regex::new(r"(?i)(don't|do not|never|stop)\s+([\w\s]{10,80})").unwrap(),
            "prohibition",
        ),
    ]
});

/// Preference patterns applied to user-role text.
pub static PREFERENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(always|prefer|I like|I want|I use|please always)\s+(.{10,100})")
            .unwrap(),
        Regex::new(r"(?i)(my preferred|my favorite|I typically|I usually)\s+(.{10,100})").unwrap(),
    ]
});

/// Gerund-phrase topic pattern: "working on X", "implementing X", ...
pub static TOPIC_ACTIVITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(working on|implementing|building|fixing|debugging|creating)\s+([\w\s-]{5,30})")
        .unwrap()
});

/// Component topic pattern: "the X module|service|...".
pub static TOPIC_COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(the\s+)([\w-]+(?:\s+[\w-]+){0,2})\s+(module|service|component|function|class|file)")
        .unwrap()
});

/// Filename-like token. Hits are further filtered by the caller.
pub static FILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[\w/.-]+/)?[\w.-]+\.\w{1,6}").unwrap());

/// Checkpoint decision patterns applied to assistant-role text.
pub static DECISION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(decided|choosing|going with|using|picked|selected)\s+(.{10,80})")
            .unwrap(),
        Regex::new(r"(?i)(approach|strategy|plan):\s*(.{10,80})").unwrap(),
    ]
});

/// Checkpoint correction patterns applied to user-role text. Distinct from
/// [`CORRECTION_PATTERNS`]: looser keywords, shorter minimum match.
pub static CHECKPOINT_CORRECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(actually|no,|wrong|instead|correction|fix|should be)\s+(.{10,100})")
            .unwrap(),
        Regex::new(r"(?i)(don't|do not|never|always|prefer|avoid)\s+(.{10,80})").unwrap(),
    ]
});

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Collapse newlines into single spaces (titles must be one line).
pub fn collapse_newlines(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A window of `pad` bytes of context on each side of `[start, end)`,
/// snapped outward-in to char boundaries.
pub fn context_window(text: &str, start: usize, end: usize, pad: usize) -> &str {
    let mut lo = start.saturating_sub(pad);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + pad).min(text.len());
    while hi < text.len() && !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi]
}

/// Detect file references in raw transcript text: filename-like tokens that
/// contain a separator, are not URLs, and are not dependency-tree noise.
pub fn detect_file_paths(raw: &str, cap: usize) -> Vec<String> {
    let mut seen = Vec::new();
    for m in FILE_PATH.find_iter(raw) {
        let candidate = m.as_str();
        if !candidate.contains('/')
            || candidate.starts_with("http")
            || candidate.contains("node_modules")
        {
            continue;
        }
        if !seen.iter().any(|s| s == candidate) {
            seen.push(candidate.to_string());
            if seen.len() >= cap {
                break;
            }
        }
    }
    seen
}
