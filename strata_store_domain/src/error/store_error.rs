// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error system for the Strata storage kernel. Errors
//! are categorized by failure mode so callers can decide systematically what is
//! retryable, what is fatal for the current operation, and what poisons a file
//! for the rest of the process.
//!
//! ## Error Categories
//!
//! - **IoError**: any underlying filesystem or channel failure. Fatal for the
//!   current operation; the caller decides whether to retry.
//! - **LockError**: inability to acquire a required process or file lock.
//!   Fatal; recovery requires operator intervention.
//! - **StateError**: a mutating operation on a sealed chunk, or a file whose
//!   magic/version does not match. Fatal.
//! - **DecodeError**: bytes that do not conform to the declared Byteable
//!   layout. Fatal for the read; the file is untrusted thereafter.
//! - **CapacityError**: a structure saturated beyond its design bound. Non
//!   fatal: the corpus deduplicator falls back to a weaker but still correct
//!   variant.
//! - **InvalidConfiguration / InternalError**: ambient failures from the
//!   configuration layer and unexpected invariant violations.
//!
//! ## Propagation Policy
//!
//! The kernel does not swallow errors except for the documented
//! capacity-fallback path and the "re-acquire a lock owned by this process"
//! warning. Everything else surfaces to the caller via `Result`.

use thiserror::Error;

/// Domain-specific errors for the storage kernel.
///
/// Each variant carries a descriptive message and represents one failure mode.
/// Variants map one-to-one onto the kernel's recovery rules: see
/// [`StoreError::is_recoverable`] and [`StoreError::category`].
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("State error: {0}")]
    StateError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Capacity exceeded: {0}")]
    CapacityError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl StoreError {
    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    /// Creates a new lock error
    pub fn lock_error(msg: impl Into<String>) -> Self {
        Self::LockError(msg.into())
    }

    /// Creates a new state error
    pub fn state_error(msg: impl Into<String>) -> Self {
        Self::StateError(msg.into())
    }

    /// Creates a new decode error
    pub fn decode_error(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Creates a new capacity error
    pub fn capacity_error(msg: impl Into<String>) -> Self {
        Self::CapacityError(msg.into())
    }

    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks if the error is recoverable
    ///
    /// IO failures may be transient and capacity failures have a documented
    /// fallback path; everything else requires intervention.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::IoError(_) | StoreError::CapacityError(_))
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            StoreError::IoError(_) => "io",
            StoreError::LockError(_) => "lock",
            StoreError::StateError(_) => "state",
            StoreError::DecodeError(_) => "decode",
            StoreError::CapacityError(_) => "capacity",
            StoreError::InvalidConfiguration(_) => "configuration",
            StoreError::InternalError(_) => "internal",
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::IoError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StoreError::io_error("disk unplugged");
        assert_eq!(error.to_string(), "IO error: disk unplugged");

        let error = StoreError::state_error("chunk is sealed");
        assert_eq!(error.to_string(), "State error: chunk is sealed");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(StoreError::io_error("x").category(), "io");
        assert_eq!(StoreError::lock_error("x").category(), "lock");
        assert_eq!(StoreError::decode_error("x").category(), "decode");
        assert_eq!(StoreError::capacity_error("x").category(), "capacity");
        assert_eq!(StoreError::invalid_config("x").category(), "configuration");
    }

    #[test]
    fn test_recoverability() {
        assert!(StoreError::io_error("transient").is_recoverable());
        assert!(StoreError::capacity_error("saturated").is_recoverable());
        assert!(!StoreError::lock_error("held elsewhere").is_recoverable());
        assert!(!StoreError::decode_error("bad tag").is_recoverable());
        assert!(!StoreError::state_error("sealed").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: StoreError = io.into();
        assert_eq!(error.category(), "io");
        assert!(error.to_string().contains("missing"));
    }
}
