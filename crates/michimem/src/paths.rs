// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data directory layout. Created at every handler entry so a fresh
//! install works without a setup step.

use michimem_config::MichimemConfig;
use michimem_core::MichimemError;

/// Create the persisted-state layout under `data_dir`:
/// `checkpoints/`, `archive/`, and the reserved per-type
/// `memories/{diary,insights,knowledge,shared}/` directories.
pub fn ensure_layout(config: &MichimemConfig) -> Result<(), MichimemError> {
    let mut dirs = vec![config.checkpoints_dir(), config.archive_dir()];
    dirs.extend(config.memories_dirs());

    for dir in dirs {
        std::fs::create_dir_all(&dir).map_err(|e| MichimemError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use michimem_config::load_config_from_str;

    #[test]
    fn creates_the_full_layout() {
        let dir = tempfile::tempdir().unwrap();
        let json = format!(r#"{{ "data_dir": "{}" }}"#, dir.path().display());
        let config = load_config_from_str(&json).unwrap();

        ensure_layout(&config).unwrap();

        assert!(config.checkpoints_dir().is_dir());
        assert!(config.archive_dir().is_dir());
        for sub in ["diary", "insights", "knowledge", "shared"] {
            assert!(dir.path().join("memories").join(sub).is_dir());
        }

        // Second run is a no-op.
        ensure_layout(&config).unwrap();
    }
}
