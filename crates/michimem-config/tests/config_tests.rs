// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Michimem configuration system.

use michimem_config::{load_config_from_dir, load_config_from_str};
use michimem_core::types::Priority;

/// Empty JSON yields all compiled defaults.
#[test]
fn empty_json_uses_defaults() {
    let config = load_config_from_str("{}").expect("empty object should load");
    assert_eq!(config.ttl.diary_days, 30);
    assert_eq!(config.ttl.insight_days, 90);
    assert_eq!(config.tokens.l0_budget, 200);
    assert_eq!(config.tokens.l1_budget, 500);
    assert_eq!(config.tokens.checkpoint_budget, 500);
    assert_eq!(config.compounding.diary_threshold, 5);
    assert_eq!(config.compounding.insight_threshold, 3);
}

/// Overriding one nested field leaves the section's siblings at defaults.
/// Whole sub-objects are never replaced.
#[test]
fn nested_override_merges_field_wise() {
    let config = load_config_from_str(r#"{ "ttl": { "diary_days": 7 } }"#).unwrap();
    assert_eq!(config.ttl.diary_days, 7);
    assert_eq!(config.ttl.insight_days, 90, "sibling field must survive");

    let config =
        load_config_from_str(r#"{ "tokens": { "l0_budget": 64 }, "compounding": { "insight_threshold": 2 } }"#)
            .unwrap();
    assert_eq!(config.tokens.l0_budget, 64);
    assert_eq!(config.tokens.l1_budget, 500);
    assert_eq!(config.compounding.insight_threshold, 2);
    assert_eq!(config.compounding.diary_threshold, 5);
}

/// All fields override together.
#[test]
fn full_override() {
    let json = r#"{
        "data_dir": "/tmp/michimem-test",
        "ttl": { "diary_days": 10, "insight_days": 20 },
        "tokens": { "l0_budget": 100, "l1_budget": 200, "checkpoint_budget": 300 },
        "compounding": { "diary_threshold": 4, "insight_threshold": 2 }
    }"#;
    let config = load_config_from_str(json).unwrap();
    assert_eq!(config.data_dir.to_str().unwrap(), "/tmp/michimem-test");
    assert_eq!(config.ttl.diary_days, 10);
    assert_eq!(config.ttl.insight_days, 20);
    assert_eq!(config.tokens.checkpoint_budget, 300);
    assert_eq!(config.compounding.diary_threshold, 4);
}

/// Unknown keys are rejected at load time.
#[test]
fn unknown_field_is_rejected() {
    let err = load_config_from_str(r#"{ "ttl": { "diary_dys": 7 } }"#)
        .expect_err("typoed key should be rejected");
    let msg = format!("{err}");
    assert!(
        msg.contains("unknown field") || msg.contains("diary_dys"),
        "error should mention the bad key, got: {msg}"
    );
}

/// Path helpers derive from data_dir.
#[test]
fn path_helpers() {
    let config = load_config_from_str(r#"{ "data_dir": "/var/mm" }"#).unwrap();
    assert_eq!(config.db_path().to_str().unwrap(), "/var/mm/index.db");
    assert_eq!(
        config.checkpoints_dir().to_str().unwrap(),
        "/var/mm/checkpoints"
    );
    assert_eq!(config.archive_dir().to_str().unwrap(), "/var/mm/archive");
    assert_eq!(config.memories_dirs().len(), 4);
}

/// Expiry policy: P0 permanent, P1 insight TTL, P2 diary TTL.
#[test]
fn expiry_for_priority() {
    let config = load_config_from_str("{}").unwrap();
    assert!(config.expiry_for(Priority::Permanent).is_none());
    let p1 = config.expiry_for(Priority::Durable).unwrap();
    let p2 = config.expiry_for(Priority::Ephemeral).unwrap();
    // insight_days (90) > diary_days (30): the P1 expiry is later.
    assert!(p1 > p2);
}

/// config.json inside the data dir is picked up and merged.
#[test]
fn config_file_in_data_dir_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{ "ttl": { "diary_days": 3 } }"#,
    )
    .unwrap();

    let config = load_config_from_dir(dir.path()).unwrap();
    assert_eq!(config.ttl.diary_days, 3);
    assert_eq!(config.ttl.insight_days, 90);
    assert_eq!(config.data_dir, dir.path());
}

/// A missing config.json is fine: defaults apply.
#[test]
fn missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from_dir(dir.path()).unwrap();
    assert_eq!(config.ttl.diary_days, 30);
}
