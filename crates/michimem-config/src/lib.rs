// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Michimem.
//!
//! User overrides live in `<data_dir>/config.json` and are deep-merged
//! field-wise over compiled defaults, with `MICHIMEM_*` environment
//! variables taking final precedence.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_dir, load_config_from_str};
pub use model::{CompoundingConfig, MichimemConfig, TokenConfig, TtlConfig};
