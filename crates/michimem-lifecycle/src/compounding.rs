// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compounding: synthesize higher-tier records from clustered lower-tier
//! ones.
//!
//! Stage 1 clusters unprocessed diaries (oldest first) into insights;
//! stage 2 clusters recent insights (newest first) into permanent
//! knowledge. Synthesis is deterministic given the cluster members.

use michimem_config::MichimemConfig;
use michimem_core::types::expiry_after_days;
use michimem_core::{Memory, MemoryInput, MemoryType, MichimemError, Priority};
use michimem_store::MemoryStore;
use tracing::info;

use crate::cluster::{group_by_overlap, OVERLAP_THRESHOLD};

/// Records fetched per stage.
const STAGE_FETCH: usize = 50;
/// Tags carried into a synthesized record.
const TAG_CAP: usize = 5;

/// Counters returned by [`run_compounding`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompoundingReport {
    pub insights_created: usize,
    pub knowledge_created: usize,
    pub diaries_processed: usize,
}

/// Run both compounding stages.
pub async fn run_compounding(
    store: &MemoryStore,
    config: &MichimemConfig,
) -> Result<CompoundingReport, MichimemError> {
    let mut report = CompoundingReport::default();

    // Stage 1: diary -> insight.
    let diaries = store.get_unprocessed_diaries(STAGE_FETCH).await?;
    if diaries.len() >= config.compounding.diary_threshold {
        for group in group_by_overlap(&diaries, OVERLAP_THRESHOLD) {
            if group.len() < config.compounding.diary_threshold {
                continue;
            }
            let members: Vec<&Memory> = group.iter().map(|&i| &diaries[i]).collect();
            let mut input = synthesize_cluster(&members, MemoryType::Insight, "auto-insight");
            input.priority = Priority::Durable;
            input.expires_at = Some(expiry_after_days(config.ttl.insight_days));
            let insight = store.insert(input).await?;
            info!(id = %insight.id, sources = members.len(), "insight synthesized");
            report.insights_created += 1;
            report.diaries_processed += members.len();
        }
    }

    // Stage 2: insight -> knowledge, over the most recently updated insights.
    let insights = store.get_by_type(MemoryType::Insight, STAGE_FETCH).await?;
    if insights.len() >= config.compounding.insight_threshold {
        for group in group_by_overlap(&insights, OVERLAP_THRESHOLD) {
            if group.len() < config.compounding.insight_threshold {
                continue;
            }
            let members: Vec<&Memory> = group.iter().map(|&i| &insights[i]).collect();
            let mut input = synthesize_cluster(&members, MemoryType::Knowledge, "auto-knowledge");
            input.priority = Priority::Permanent;
            input.expires_at = None;
            let knowledge = store.insert(input).await?;
            info!(id = %knowledge.id, sources = members.len(), "knowledge synthesized");
            report.knowledge_created += 1;
        }
    }

    Ok(report)
}

/// Build the synthesized record for one cluster.
///
/// Title and summary name the top tags and cluster size; content lists
/// every member with a trailing date-range line; tags are the top source
/// tags plus the stage marker.
pub fn synthesize_cluster(
    members: &[&Memory],
    memory_type: MemoryType,
    marker_tag: &str,
) -> MemoryInput {
    let top_tags = top_tags(members, TAG_CAP);
    let label = if top_tags.is_empty() {
        "general".to_string()
    } else {
        top_tags.join(", ")
    };
    let count = members.len();

    let mut content: Vec<String> = members
        .iter()
        .map(|m| format!("- {}: {}", m.title, m.summary))
        .collect();
    if let (Some(min), Some(max)) = (
        members.iter().map(|m| m.created_at.as_str()).min(),
        members.iter().map(|m| m.created_at.as_str()).max(),
    ) {
        content.push(format!(
            "\nDate range: {} to {}",
            date_of(min),
            date_of(max)
        ));
    }

    let mut tags = top_tags;
    tags.push(marker_tag.to_string());

    MemoryInput {
        memory_type,
        priority: Priority::Durable,
        title: format!("Pattern: {label} (from {count} sessions)"),
        summary: format!("Recurring pattern across {count} sessions involving {label}"),
        content: content.join("\n"),
        tags,
        source_ids: members.iter().map(|m| m.id.clone()).collect(),
        ..Default::default()
    }
}

/// Distinct member tags ranked by frequency; ties keep first appearance.
fn top_tags(members: &[&Memory], cap: usize) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for member in members {
        for tag in &member.tags {
            match counts.iter_mut().find(|(t, _)| t == tag) {
                Some((_, n)) => *n += 1,
                None => counts.push((tag.clone(), 1)),
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(cap).map(|(t, _)| t).collect()
}

/// The date part of an ISO timestamp.
fn date_of(timestamp: &str) -> &str {
    timestamp.get(..10).unwrap_or(timestamp)
}
