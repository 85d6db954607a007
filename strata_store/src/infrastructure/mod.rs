// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure layer: everything that owns a file descriptor, a memory
//! map, or a subscriber. Pure logic stays in the domain crate.

pub mod file_sink;
pub mod filesystem;
pub mod logging;

pub use file_sink::{write_byteable, BufferedFileSink, MappedFileSink, SCRATCH_CAPACITY};
pub use filesystem::ProcessLock;
