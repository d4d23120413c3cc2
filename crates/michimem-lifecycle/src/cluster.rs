// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Overlap clustering of memory records.
//!
//! Deterministic first-fit grouping by word overlap: the first unassigned
//! record seeds a group and pulls in every later unassigned record whose
//! Jaccard-over-min word overlap reaches the threshold. Output depends on
//! input order; the store's ordering guarantees (oldest-first diaries,
//! newest-first insights) are part of the contract.

use std::collections::HashSet;

use michimem_core::Memory;

/// Overlap at or above this fraction joins a cluster.
pub const OVERLAP_THRESHOLD: f64 = 0.15;

/// The record's comparison words: lowercase tokens longer than 3 chars
/// drawn from title, summary, and tags.
pub fn word_set(memory: &Memory) -> HashSet<String> {
    let text = format!(
        "{} {} {}",
        memory.title,
        memory.summary,
        memory.tags.join(" ")
    );
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() > 3)
        .map(|token| token.to_lowercase())
        .collect()
}

/// Jaccard-over-min: intersection size over the smaller set's size.
/// Empty sets never overlap.
pub fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / a.len().min(b.len()) as f64
}

/// Partition `memories` into clusters, preserving input order.
///
/// Returns groups of indices into the input slice. Every input index
/// appears in exactly one group.
pub fn group_by_overlap(memories: &[Memory], threshold: f64) -> Vec<Vec<usize>> {
    let words: Vec<HashSet<String>> = memories.iter().map(word_set).collect();
    let mut assigned = vec![false; memories.len()];
    let mut groups = Vec::new();

    for seed in 0..memories.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut group = vec![seed];
        for candidate in 0..memories.len() {
            if assigned[candidate] {
                continue;
            }
            if overlap(&words[seed], &words[candidate]) >= threshold {
                assigned[candidate] = true;
                group.push(candidate);
            }
        }
        groups.push(group);
    }
    groups
}
