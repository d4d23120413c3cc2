// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hook dispatcher: translate host lifecycle events into store operations.
//!
//! Each invocation is short-lived: read one JSON payload from stdin,
//! dispatch, exit. The store is opened at entry and closed on all exit
//! paths, including errors. Output (SessionStart context injection) goes
//! to stdout; everything else is silent.

use std::path::Path;

use michimem_config::{load_config, MichimemConfig};
use michimem_context::{build_l0_context, build_restore_context};
use michimem_core::MichimemError;
use michimem_extract::{create_checkpoint, extract_session, latest_checkpoint};
use michimem_lifecycle::{run_compounding, run_lifecycle};
use michimem_store::MemoryStore;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::paths::ensure_layout;

/// The JSON payload delivered by the host on stdin.
///
/// Unknown fields are tolerated; absent fields default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookPayload {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub transcript_path: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub hook_event_name: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub stop_hook_active: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Parse the stdin payload. A malformed payload is a protocol error
/// (process exit 1).
pub fn parse_payload(payload_json: &str) -> Result<HookPayload, MichimemError> {
    serde_json::from_str(payload_json)
        .map_err(|e| MichimemError::Protocol(format!("malformed hook payload: {e}")))
}

/// Top-level dispatch: load config, open the store, run the handler,
/// close the store on every path.
pub async fn dispatch(event: &str, payload_json: &str) -> Result<Option<String>, MichimemError> {
    let payload = parse_payload(payload_json)?;
    let config = load_config().map_err(|e| MichimemError::Config(e.to_string()))?;
    dispatch_with_config(event, &payload, &config).await
}

/// Dispatch against an explicit configuration (the testable core).
pub async fn dispatch_with_config(
    event: &str,
    payload: &HookPayload,
    config: &MichimemConfig,
) -> Result<Option<String>, MichimemError> {
    ensure_layout(config)?;
    let store = MemoryStore::open(&config.db_path()).await?;

    let result = match event {
        "SessionStart" => on_session_start(&store, config, payload).await,
        "PreCompact" => on_pre_compact(&store, config, payload).await.map(|_| None),
        "Stop" => on_stop(&store, config, payload).await.map(|_| None),
        "SessionEnd" => on_session_end(&store, config, payload).await.map(|_| None),
        other => {
            // A recognized invocation with an event this system does not
            // handle is a benign skip, not an error.
            debug!(event = other, "ignoring unhandled hook event");
            Ok(None)
        }
    };

    let close_result = store.close().await;
    let output = result?;
    close_result?;
    Ok(output)
}

/// SessionStart: inject the L0 overview, plus the latest checkpoint's
/// restore block when resuming from compaction. Silent when empty.
pub async fn on_session_start(
    store: &MemoryStore,
    config: &MichimemConfig,
    payload: &HookPayload,
) -> Result<Option<String>, MichimemError> {
    let mut context = build_l0_context(store, config).await?;

    if payload.source.as_deref() == Some("compact") {
        if let Some(checkpoint) = latest_checkpoint(&payload.session_id, config) {
            let restore = build_restore_context(&checkpoint);
            if context.is_empty() {
                context = restore;
            } else {
                context.push_str("\n\n");
                context.push_str(&restore);
            }
        }
    }

    if context.is_empty() {
        return Ok(None);
    }
    let output = serde_json::json!({
        "hookSpecificOutput": {
            "hookEventName": "SessionStart",
            "additionalContext": context,
        }
    });
    Ok(Some(output.to_string()))
}

/// PreCompact: snapshot the session before the host shortens its context.
pub async fn on_pre_compact(
    store: &MemoryStore,
    config: &MichimemConfig,
    payload: &HookPayload,
) -> Result<(), MichimemError> {
    let checkpoint_created = match create_checkpoint(
        &payload.session_id,
        Path::new(&payload.transcript_path),
        config,
    ) {
        Ok(Some(_)) => true,
        Ok(None) => false,
        Err(e) => {
            warn!(error = %e, "checkpoint creation failed");
            false
        }
    };

    store
        .record_metric(
            "precompact",
            serde_json::json!({
                "session_id": payload.session_id,
                "trigger": payload.trigger,
                "checkpoint_created": checkpoint_created,
            }),
        )
        .await;
    Ok(())
}

/// Stop: extract the finished session into the store. Corrections and
/// preferences are inserted only when no record with that title exists.
pub async fn on_stop(
    store: &MemoryStore,
    config: &MichimemConfig,
    payload: &HookPayload,
) -> Result<(), MichimemError> {
    if payload.stop_hook_active {
        return Ok(());
    }

    let extraction = extract_session(Path::new(&payload.transcript_path), config);

    let mut diary_inserted = false;
    if let Some(diary) = extraction.diary {
        store.insert(diary).await?;
        diary_inserted = true;
    }

    let mut corrections = 0usize;
    for candidate in extraction.corrections {
        if store
            .get_by_title(&candidate.title, candidate.memory_type)
            .await?
            .is_none()
        {
            store.insert(candidate).await?;
            corrections += 1;
        }
    }

    let mut preferences = 0usize;
    for candidate in extraction.preferences {
        if store
            .get_by_title(&candidate.title, candidate.memory_type)
            .await?
            .is_none()
        {
            store.insert(candidate).await?;
            preferences += 1;
        }
    }

    store
        .record_metric(
            "stop_extract",
            serde_json::json!({
                "session_id": payload.session_id,
                "diary": diary_inserted,
                "corrections": corrections,
                "preferences": preferences,
            }),
        )
        .await;
    Ok(())
}

/// SessionEnd: compound, then drain expired records.
pub async fn on_session_end(
    store: &MemoryStore,
    config: &MichimemConfig,
    payload: &HookPayload,
) -> Result<(), MichimemError> {
    let compounding = run_compounding(store, config).await?;
    let lifecycle = run_lifecycle(store, config).await?;

    store
        .record_metric(
            "session_end",
            serde_json::json!({
                "session_id": payload.session_id,
                "insights_created": compounding.insights_created,
                "knowledge_created": compounding.knowledge_created,
                "diaries_processed": compounding.diaries_processed,
                "expired": lifecycle.expired,
                "archived": lifecycle.archived,
            }),
        )
        .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_parses_with_defaults_and_extras() {
        let payload = parse_payload(
            r#"{"session_id":"s1","transcript_path":"/tmp/t.jsonl","hook_event_name":"Stop","unknown_field":1}"#,
        )
        .unwrap();
        assert_eq!(payload.session_id, "s1");
        assert!(!payload.stop_hook_active);
        assert!(payload.source.is_none());
    }

    #[test]
    fn malformed_payload_is_a_protocol_error() {
        let err = parse_payload("{ nope").unwrap_err();
        assert!(matches!(err, MichimemError::Protocol(_)));
    }

    #[test]
    fn compact_source_round_trips() {
        let payload =
            parse_payload(r#"{"session_id":"abc","source":"compact","trigger":"auto"}"#).unwrap();
        assert_eq!(payload.source.as_deref(), Some("compact"));
        assert_eq!(payload.trigger.as_deref(), Some("auto"));
    }
}
