// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tiered context views over the store.
//!
//! Three levels of progressive disclosure: L0 is a compact auto-injected
//! overview, L1 a search summary, L2 a full single-record render. Every
//! level is bounded by the configured token budgets using the shared
//! `ceil(bytes / 4)` estimator.

use michimem_config::MichimemConfig;
use michimem_core::{Memory, MemoryType, MichimemError, Priority};
use michimem_store::MemoryStore;

/// P0 records considered for L0.
const L0_CORE_FETCH: usize = 20;
/// Insights considered for L0.
const L0_INSIGHT_FETCH: usize = 10;
/// Shared records considered for L0.
const L0_SHARED_FETCH: usize = 5;

/// Token estimate: `ceil(len / 4)` over bytes. The formula is a contract;
/// its precision is not.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// One rendered entry of a tiered view.
#[derive(Debug, Clone)]
pub struct TieredEntry {
    pub memory: Memory,
    pub text: String,
    pub tokens: usize,
}

/// Build the L0 overview: priority-0 records, then recent insights, then
/// shared records, greedily emitted under one shared token budget.
///
/// Each group stops at the first entry that would overflow the budget
/// (no skip-and-continue). A record reached by more than one group query
/// is emitted once.
pub async fn build_l0(
    store: &MemoryStore,
    config: &MichimemConfig,
) -> Result<Vec<TieredEntry>, MichimemError> {
    let budget = config.tokens.l0_budget;
    let mut entries: Vec<TieredEntry> = Vec::new();
    let mut used = 0usize;

    let groups = [
        store.get_by_priority(Priority::Permanent, L0_CORE_FETCH).await?,
        store.get_by_type(MemoryType::Insight, L0_INSIGHT_FETCH).await?,
        store.get_by_type(MemoryType::Shared, L0_SHARED_FETCH).await?,
    ];

    for group in groups {
        for memory in group {
            if entries.iter().any(|e| e.memory.id == memory.id) {
                continue;
            }
            let text = format!("{}: {}", memory.title, memory.summary);
            let tokens = estimate_tokens(&text);
            if used + tokens > budget {
                break;
            }
            used += tokens;
            entries.push(TieredEntry {
                memory,
                text,
                tokens,
            });
        }
    }

    Ok(entries)
}

/// Build L1 summaries for a sequence of records, in order, until the L1
/// token budget would be exceeded.
pub fn build_l1(memories: &[Memory], config: &MichimemConfig) -> Vec<TieredEntry> {
    let budget = config.tokens.l1_budget;
    let mut entries = Vec::new();
    let mut used = 0usize;

    for memory in memories {
        let text = render_l1(memory);
        let tokens = estimate_tokens(&text);
        if used + tokens > budget {
            break;
        }
        used += tokens;
        entries.push(TieredEntry {
            memory: memory.clone(),
            text,
            tokens,
        });
    }
    entries
}

/// The L1 paragraph for one record.
pub fn render_l1(memory: &Memory) -> String {
    let mut text = format!(
        "**{}** ({}/{}) [id:{}]\n{}",
        memory.title, memory.memory_type, memory.priority, memory.id, memory.summary
    );
    if !memory.tags.is_empty() {
        text.push_str(&format!("\n[Tags: {}]", memory.tags.join(", ")));
    }
    text
}

/// The full L2 render of a single record.
pub fn build_l2(memory: &Memory) -> TieredEntry {
    let mut text = format!(
        "**{}** ({}/{}) [id:{}]\n",
        memory.title, memory.memory_type, memory.priority, memory.id
    );
    if !memory.tags.is_empty() {
        text.push_str(&format!("Tags: {}\n", memory.tags.join(", ")));
    }
    text.push_str(&format!(
        "Created: {}\nUpdated: {}\n",
        memory.created_at, memory.updated_at
    ));
    if let Some(expires) = &memory.expires_at {
        text.push_str(&format!("Expires: {expires}\n"));
    }
    text.push_str(&format!("\n{}", memory.content));

    let tokens = estimate_tokens(&text);
    TieredEntry {
        memory: memory.clone(),
        text,
        tokens,
    }
}

/// Render the L0 overview as an injectable context block.
///
/// Groups: priority-0 records under "Core Knowledge", insights under
/// "Recent Insights", shared records under "Shared Memories". Returns an
/// empty string when there is nothing to inject.
pub async fn build_l0_context(
    store: &MemoryStore,
    config: &MichimemConfig,
) -> Result<String, MichimemError> {
    let entries = build_l0(store, config).await?;
    if entries.is_empty() {
        return Ok(String::new());
    }

    let mut core = Vec::new();
    let mut insights = Vec::new();
    let mut shared = Vec::new();
    for entry in &entries {
        if entry.memory.priority == Priority::Permanent {
            core.push(entry);
        } else if entry.memory.memory_type == MemoryType::Insight {
            insights.push(entry);
        } else if entry.memory.memory_type == MemoryType::Shared {
            shared.push(entry);
        }
    }

    let mut sections = Vec::new();
    for (heading, group) in [
        ("Core Knowledge", core),
        ("Recent Insights", insights),
        ("Shared Memories", shared),
    ] {
        if group.is_empty() {
            continue;
        }
        let bullets: Vec<String> = group.iter().map(|e| format!("- {}", e.text)).collect();
        sections.push(format!("## {heading}\n{}", bullets.join("\n")));
    }

    Ok(format!(
        "<michimem-context>\n{}\n</michimem-context>",
        sections.join("\n\n")
    ))
}

/// Render a checkpoint as a session-restore block. Empty fields are
/// omitted entirely.
pub fn build_restore_context(checkpoint: &michimem_core::Checkpoint) -> String {
    let mut sections = Vec::new();

    if !checkpoint.current_task.is_empty() {
        sections.push(format!("**Current task**: {}", checkpoint.current_task));
    }
    if !checkpoint.decisions.is_empty() {
        sections.push(format!(
            "**Decisions made**:\n{}",
            bullet_list(&checkpoint.decisions)
        ));
    }
    if !checkpoint.files_modified.is_empty() {
        sections.push(format!(
            "**Files modified**:\n{}",
            bullet_list(&checkpoint.files_modified)
        ));
    }
    if !checkpoint.corrections.is_empty() {
        sections.push(format!(
            "**User corrections**:\n{}",
            bullet_list(&checkpoint.corrections)
        ));
    }
    if !checkpoint.context_summary.is_empty() {
        sections.push(format!(
            "**Recent context**:\n{}",
            checkpoint.context_summary
        ));
    }

    format!(
        "<michimem-restore>\n{}\n</michimem-restore>",
        sections.join("\n\n")
    )
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
