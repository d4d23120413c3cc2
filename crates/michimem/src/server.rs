// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The memory tool server: a sequential JSON-RPC loop over stdio speaking
//! the host tool protocol (initialize, tools/list, tools/call).
//!
//! Requests are serviced one at a time; the store handle lives for the
//! server's lifetime. Tool-level failures surface as `isError` results
//! inside the protocol, never as process exits.

use michimem_config::MichimemConfig;
use michimem_context::{build_l1, build_l2, build_restore_context};
use michimem_core::{MemoryInput, MemoryPatch, MemoryType, MichimemError, Priority};
use michimem_extract::latest_checkpoint;
use michimem_store::MemoryStore;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::paths::ensure_layout;

/// Protocol revision answered to `initialize`.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Default hit count for `mem_search`.
const SEARCH_DEFAULT_LIMIT: usize = 10;

/// Serve tool requests over stdin/stdout until EOF.
pub async fn run_server(config: &MichimemConfig) -> Result<(), MichimemError> {
    ensure_layout(config)?;
    let store = MemoryStore::open(&config.db_path()).await?;
    info!(db = %config.db_path().display(), "tool server ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.map_err(|e| MichimemError::Io {
        path: "<stdin>".into(),
        source: e,
    })? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = handle_message(&store, config, &line).await {
            let mut framed = response.to_string();
            framed.push('\n');
            let written = async {
                stdout.write_all(framed.as_bytes()).await?;
                stdout.flush().await
            }
            .await;
            written.map_err(|e| MichimemError::Io {
                path: "<stdout>".into(),
                source: e,
            })?;
        }
    }

    store.close().await
}

/// Handle one protocol message. Returns `None` for notifications.
pub async fn handle_message(
    store: &MemoryStore,
    config: &MichimemConfig,
    line: &str,
) -> Option<Value> {
    let request: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Some(error_response(Value::Null, -32700, &format!("parse error: {e}"))),
    };
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let id = match request.get("id") {
        Some(id) => id.clone(),
        // Notifications (initialized, cancelled, ...) get no response.
        None => {
            debug!(method = %method, "notification");
            return None;
        }
    };
    let params = request.get("params").cloned().unwrap_or(Value::Null);

    let response = match method.as_str() {
        "initialize" => result_response(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "michimem",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        "ping" => result_response(id, json!({})),
        "tools/list" => result_response(id, json!({ "tools": tool_descriptors() })),
        "tools/call" => {
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
            match call_tool(store, config, name, &arguments).await {
                Some(result) => result_response(id, result),
                None => error_response(id, -32602, &format!("unknown tool: {name}")),
            }
        }
        other => error_response(id, -32601, &format!("method not found: {other}")),
    };
    Some(response)
}

/// Dispatch one tool invocation. `None` means the tool name is unknown.
async fn call_tool(
    store: &MemoryStore,
    config: &MichimemConfig,
    name: &str,
    arguments: &Value,
) -> Option<Value> {
    let outcome = match name {
        "mem_search" => {
            let query = arguments
                .get("query")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let limit = arguments
                .get("limit")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(SEARCH_DEFAULT_LIMIT);
            mem_search(store, config, query, limit).await
        }
        "mem_recall" => {
            let memory_id = arguments
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default();
            mem_recall(store, memory_id).await
        }
        "mem_store" => match serde_json::from_value::<MemStoreArgs>(arguments.clone()) {
            Ok(args) => mem_store(store, config, args).await,
            Err(e) => Err(MichimemError::Protocol(format!("bad mem_store arguments: {e}"))),
        },
        "mem_stats" => mem_stats(store).await,
        "mem_restore" => {
            let session_id = arguments
                .get("session_id")
                .and_then(Value::as_str)
                .unwrap_or_default();
            mem_restore(config, session_id)
        }
        _ => return None,
    };
    Some(tool_result(outcome))
}

/// Arguments of the `mem_store` tool.
#[derive(Debug, Deserialize)]
pub struct MemStoreArgs {
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(rename = "type", default = "default_store_type")]
    pub memory_type: MemoryType,
    #[serde(default = "default_store_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_store_type() -> MemoryType {
    MemoryType::Insight
}

fn default_store_priority() -> Priority {
    Priority::Durable
}

/// Full-text search rendered as L1 summaries.
pub async fn mem_search(
    store: &MemoryStore,
    config: &MichimemConfig,
    query: &str,
    limit: usize,
) -> Result<String, MichimemError> {
    let hits = store.search(query, limit).await?;
    if hits.is_empty() {
        return Ok("No memories found.".to_string());
    }
    let memories: Vec<_> = hits.into_iter().map(|hit| hit.memory).collect();
    let entries = build_l1(&memories, config);
    Ok(entries
        .iter()
        .map(|e| e.text.clone())
        .collect::<Vec<_>>()
        .join("\n\n"))
}

/// Full L2 render of one record.
pub async fn mem_recall(store: &MemoryStore, id: &str) -> Result<String, MichimemError> {
    match store.get_by_id(id).await? {
        Some(memory) => Ok(build_l2(&memory).text),
        None => Err(MichimemError::NotFound(id.to_string())),
    }
}

/// Store a record, or update the existing same-title same-type one.
pub async fn mem_store(
    store: &MemoryStore,
    config: &MichimemConfig,
    args: MemStoreArgs,
) -> Result<String, MichimemError> {
    if let Some(existing) = store.get_by_title(&args.title, args.memory_type).await? {
        store
            .update(
                &existing.id,
                MemoryPatch {
                    summary: Some(args.summary),
                    content: Some(args.content),
                    ..Default::default()
                },
            )
            .await?;
        return Ok(format!("Updated existing memory {}", existing.id));
    }

    let expires_at = config.expiry_for(args.priority);
    let memory = store
        .insert(MemoryInput {
            memory_type: args.memory_type,
            priority: args.priority,
            title: args.title,
            summary: args.summary,
            content: args.content,
            tags: args.tags,
            expires_at,
            ..Default::default()
        })
        .await?;
    Ok(format!("Stored memory {}", memory.id))
}

/// Store aggregates rendered as markdown.
pub async fn mem_stats(store: &MemoryStore) -> Result<String, MichimemError> {
    let stats = store.stats().await?;
    let mut out = format!("## Memory Stats\n\nTotal: {}\n", stats.total);
    if !stats.by_type.is_empty() {
        out.push_str("\n### By type\n");
        for (memory_type, count) in &stats.by_type {
            out.push_str(&format!("- {memory_type}: {count}\n"));
        }
    }
    if !stats.by_priority.is_empty() {
        out.push_str("\n### By priority\n");
        for (priority, count) in &stats.by_priority {
            out.push_str(&format!("- P{priority}: {count}\n"));
        }
    }
    out.push_str(&format!("\nExpired: {}\n", stats.expired));
    Ok(out)
}

/// Restore text for a session's latest checkpoint.
pub fn mem_restore(config: &MichimemConfig, session_id: &str) -> Result<String, MichimemError> {
    match latest_checkpoint(session_id, config) {
        Some(checkpoint) => Ok(build_restore_context(&checkpoint)),
        None => Err(MichimemError::Protocol(format!(
            "No checkpoint found for session: {session_id}"
        ))),
    }
}

/// Wrap a tool outcome into a protocol tool result.
fn tool_result(outcome: Result<String, MichimemError>) -> Value {
    let (text, is_error) = match outcome {
        Ok(text) => (text, false),
        Err(MichimemError::NotFound(id)) => (format!("Memory not found: {id}"), true),
        Err(MichimemError::Protocol(message)) => (message, true),
        Err(e) => (e.to_string(), true),
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

fn result_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

/// Descriptors for `tools/list`.
fn tool_descriptors() -> Value {
    json!([
        {
            "name": "mem_search",
            "description": "Full-text search over stored memories; returns L1 summaries.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "FTS5 query expression" },
                    "limit": { "type": "number", "description": "Maximum hits (default 10)" }
                },
                "required": ["query"]
            }
        },
        {
            "name": "mem_recall",
            "description": "Recall one memory in full by id.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "Memory id" }
                },
                "required": ["id"]
            }
        },
        {
            "name": "mem_store",
            "description": "Store a memory, updating any existing record with the same title and type.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "summary": { "type": "string" },
                    "content": { "type": "string" },
                    "type": { "type": "string", "enum": ["diary", "insight", "knowledge", "shared"] },
                    "priority": { "type": "number", "enum": [0, 1, 2] },
                    "tags": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["title", "summary", "content"]
            }
        },
        {
            "name": "mem_stats",
            "description": "Aggregate counts over the memory store.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "mem_restore",
            "description": "Latest session checkpoint rendered as restore context.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "session_id": { "type": "string" }
                },
                "required": ["session_id"]
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use michimem_config::load_config_from_str;

    fn config() -> MichimemConfig {
        load_config_from_str("{}").unwrap()
    }

    fn store_args(title: &str, summary: &str, content: &str) -> MemStoreArgs {
        MemStoreArgs {
            title: title.into(),
            summary: summary.into(),
            content: content.into(),
            memory_type: MemoryType::Insight,
            priority: Priority::Durable,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn initialize_and_tools_list() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let config = config();

        let response = handle_message(
            &store,
            &config,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        )
        .await
        .unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["serverInfo"]["name"], "michimem");

        let response = handle_message(
            &store,
            &config,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        )
        .await
        .unwrap();
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 5);
        assert!(tools.iter().any(|t| t["name"] == "mem_search"));
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let response = handle_message(
            &store,
            &config(),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn unknown_method_and_unknown_tool() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let config = config();

        let response = handle_message(
            &store,
            &config,
            r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#,
        )
        .await
        .unwrap();
        assert_eq!(response["error"]["code"], -32601);

        let response = handle_message(
            &store,
            &config,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"mem_nope","arguments":{}}}"#,
        )
        .await
        .unwrap();
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn mem_search_empty_store() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let text = mem_search(&store, &config(), "anything", 10).await.unwrap();
        assert_eq!(text, "No memories found.");
    }

    #[tokio::test]
    async fn mem_search_renders_l1_entries() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let config = config();
        mem_store(&store, &config, store_args("Auth flow", "jwt everywhere", "body"))
            .await
            .unwrap();

        let text = mem_search(&store, &config, "jwt", 10).await.unwrap();
        assert!(text.contains("**Auth flow** (insight/P1) [id:"));
        assert!(text.contains("\njwt everywhere"));
    }

    #[tokio::test]
    async fn mem_store_is_idempotent_by_title_and_type() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let config = config();

        let first = mem_store(&store, &config, store_args("Auth flow", "s1", "c1"))
            .await
            .unwrap();
        assert!(first.starts_with("Stored memory "));

        // Same title modulo case: update, not a second record.
        let second = mem_store(&store, &config, store_args("auth flow", "s2", "c2"))
            .await
            .unwrap();
        assert!(second.starts_with("Updated existing memory "));

        let insights = store.get_by_type(MemoryType::Insight, 10).await.unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].summary, "s2");
        assert_eq!(insights[0].content, "c2");
        assert_eq!(insights[0].title, "Auth flow", "title keeps its original form");
    }

    #[tokio::test]
    async fn mem_store_sets_expiry_from_priority() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let config = config();

        let mut args = store_args("permanent note", "s", "c");
        args.memory_type = MemoryType::Knowledge;
        args.priority = Priority::Permanent;
        mem_store(&store, &config, args).await.unwrap();
        let k = &store.get_by_type(MemoryType::Knowledge, 1).await.unwrap()[0];
        assert!(k.expires_at.is_none());

        let mut args = store_args("short note", "s", "c");
        args.memory_type = MemoryType::Diary;
        args.priority = Priority::Ephemeral;
        mem_store(&store, &config, args).await.unwrap();
        let d = &store.get_by_type(MemoryType::Diary, 1).await.unwrap()[0];
        assert!(d.expires_at.is_some());
    }

    #[tokio::test]
    async fn mem_recall_found_and_missing() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let config = config();
        mem_store(&store, &config, store_args("Auth flow", "sum", "the full body"))
            .await
            .unwrap();
        let id = store.get_by_type(MemoryType::Insight, 1).await.unwrap()[0]
            .id
            .clone();

        let text = mem_recall(&store, &id).await.unwrap();
        assert!(text.contains("**Auth flow**"));
        assert!(text.contains("the full body"));

        let err = mem_recall(&store, "missing-id").await.unwrap_err();
        assert!(matches!(err, MichimemError::NotFound(_)));
        let result = tool_result(Err(err));
        assert_eq!(result["isError"], true);
        assert_eq!(
            result["content"][0]["text"],
            "Memory not found: missing-id"
        );
    }

    #[tokio::test]
    async fn mem_stats_renders_markdown() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let config = config();
        mem_store(&store, &config, store_args("one", "s", "c")).await.unwrap();

        let text = mem_stats(&store).await.unwrap();
        assert!(text.starts_with("## Memory Stats"));
        assert!(text.contains("Total: 1"));
        assert!(text.contains("- insight: 1"));
        assert!(text.contains("- P1: 1"));
        assert!(text.contains("Expired: 0"));
    }

    #[tokio::test]
    async fn mem_restore_without_checkpoint_is_an_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let json = format!(r#"{{ "data_dir": "{}" }}"#, dir.path().display());
        let config = load_config_from_str(&json).unwrap();

        let err = mem_restore(&config, "ghost").unwrap_err();
        let result = tool_result(Err(err));
        assert_eq!(result["isError"], true);
        assert_eq!(
            result["content"][0]["text"],
            "No checkpoint found for session: ghost"
        );
    }

    #[tokio::test]
    async fn tools_call_roundtrip_through_the_protocol() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let config = config();

        let line = r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"mem_store","arguments":{"title":"T","summary":"S","content":"C"}}}"#;
        let response = handle_message(&store, &config, line).await.unwrap();
        assert_eq!(response["result"]["isError"], false);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Stored memory "));

        let line = r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"mem_search","arguments":{"query":"T"}}}"#;
        let response = handle_message(&store, &config, line).await.unwrap();
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("**T**"));
    }
}
