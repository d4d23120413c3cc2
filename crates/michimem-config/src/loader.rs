// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier, key-wise at every nesting level):
//! compiled defaults > `<data_dir>/config.json` > `MICHIMEM_*` env vars.
//! Figment merges per key, so `{"ttl":{"diary_days":7}}` overrides only
//! that field and leaves `ttl.insight_days` at its default.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};

use crate::model::MichimemConfig;

/// Environment variable that relocates the data directory (and with it the
/// `config.json` lookup) before the config file is consulted.
const DATA_DIR_ENV: &str = "MICHIMEM_DATA_DIR";

/// Load configuration from the standard location with env var overrides.
///
/// The data directory is resolved first (env override, then the compiled
/// default) so the user's `config.json` can be found inside it.
pub fn load_config() -> Result<MichimemConfig, figment::Error> {
    let data_dir = resolve_data_dir();
    load_config_from_dir(&data_dir)
}

/// Load configuration rooted at an explicit data directory.
pub fn load_config_from_dir(data_dir: &Path) -> Result<MichimemConfig, figment::Error> {
    let defaults = MichimemConfig {
        data_dir: data_dir.to_path_buf(),
        ..MichimemConfig::default()
    };

    Figment::new()
        .merge(Serialized::defaults(defaults))
        .merge(Json::file(data_dir.join("config.json")))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a JSON string only (no file or env lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(json: &str) -> Result<MichimemConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MichimemConfig::default()))
        .merge(Json::string(json))
        .extract()
}

/// Resolve the data directory: env override, then compiled default.
fn resolve_data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| MichimemConfig::default().data_dir)
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that underscore-bearing
/// key names stay intact: `MICHIMEM_TTL_DIARY_DAYS` must map to
/// `ttl.diary_days`, not `ttl.diary.days`.
fn env_provider() -> Env {
    Env::prefixed("MICHIMEM_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("ttl_", "ttl.", 1)
            .replacen("tokens_", "tokens.", 1)
            .replacen("compounding_", "compounding.", 1);
        mapped.into()
    })
}
