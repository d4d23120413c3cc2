// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle: drain expired records, archiving each to markdown first.
//!
//! Archival is best-effort: a failed archive write is logged and the
//! record is deleted anyway, it just does not count as archived. Archive
//! filename collisions are tolerated for the same reason.

use std::path::{Path, PathBuf};

use michimem_config::MichimemConfig;
use michimem_core::{Memory, MichimemError};
use michimem_store::MemoryStore;
use tracing::{info, warn};

/// Counters returned by [`run_lifecycle`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LifecycleReport {
    pub expired: usize,
    pub archived: usize,
}

/// Archive and delete every expired record.
pub async fn run_lifecycle(
    store: &MemoryStore,
    config: &MichimemConfig,
) -> Result<LifecycleReport, MichimemError> {
    let expired = store.get_expired().await?;
    let mut report = LifecycleReport {
        expired: expired.len(),
        archived: 0,
    };
    if expired.is_empty() {
        return Ok(report);
    }

    let archive_dir = config.archive_dir();
    if let Err(e) = tokio::fs::create_dir_all(&archive_dir).await {
        warn!(dir = %archive_dir.display(), error = %e, "cannot create archive directory");
    }

    for memory in &expired {
        let archived = match write_archive(&archive_dir, memory).await {
            Ok(path) => {
                info!(id = %memory.id, path = %path.display(), "memory archived");
                true
            }
            Err(e) => {
                warn!(id = %memory.id, error = %e, "archive write failed, deleting anyway");
                false
            }
        };
        if archived {
            report.archived += 1;
        }

        store.delete(&memory.id).await?;
        store
            .record_metric(
                "lifecycle_expire",
                serde_json::json!({
                    "id": memory.id,
                    "type": memory.memory_type.as_str(),
                    "archived": archived,
                }),
            )
            .await;
    }

    Ok(report)
}

/// Write one record's markdown snapshot into the archive directory.
async fn write_archive(dir: &Path, memory: &Memory) -> Result<PathBuf, std::io::Error> {
    let date = chrono::Utc::now().format("%Y-%m-%d");
    let prefix: String = memory.id.chars().take(8).collect();
    let path = dir.join(format!("{date}-{prefix}.md"));
    tokio::fs::write(&path, render_archive(memory)).await?;
    Ok(path)
}

/// The archived markdown form of a record.
pub fn render_archive(memory: &Memory) -> String {
    let mut doc = format!("# {}\n\n", memory.title);
    doc.push_str(&format!("- id: {}\n", memory.id));
    doc.push_str(&format!("- type: {}\n", memory.memory_type));
    doc.push_str(&format!("- priority: {}\n", memory.priority));
    if !memory.tags.is_empty() {
        doc.push_str(&format!("- tags: {}\n", memory.tags.join(", ")));
    }
    doc.push_str(&format!("- created: {}\n", memory.created_at));
    doc.push_str(&format!("- updated: {}\n", memory.updated_at));
    if let Some(expires) = &memory.expires_at {
        doc.push_str(&format!("- expires: {expires}\n"));
    }
    doc.push_str(&format!("\n## Summary\n\n{}\n", memory.summary));
    doc.push_str(&format!("\n## Content\n\n{}\n", memory.content));
    doc
}
