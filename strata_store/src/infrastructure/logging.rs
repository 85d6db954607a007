// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Kernel Logging Setup
//!
//! Opt-in tracing initialization for hosts that do not install their own
//! subscriber. Library code only emits `tracing` events; it never installs a
//! subscriber on its own, so embedding engines keep full control of their
//! logging pipeline.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a formatted tracing subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; subsequent calls are no-ops. Defaults to
/// `info` for the kernel's targets when `RUST_LOG` is unset.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("strata_store=info"));
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
