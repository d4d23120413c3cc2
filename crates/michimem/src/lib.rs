// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Michimem entry points: the hook dispatcher and the tool server.
//!
//! The binary is thin; the handlers live here so integration tests can
//! drive them directly.

pub mod hooks;
pub mod paths;
pub mod server;
