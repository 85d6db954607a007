// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Byte Sinks
//!
//! Destinations for the kernel's uniform big-endian encoding. A [`ByteSink`]
//! accepts primitive puts and reports its logical position; the concrete
//! destination is one of:
//!
//! - [`HeapSink`] - a growable heap buffer
//! - [`SliceSink`] - a fixed byte window, including windows into mapped files
//! - [`HashSink`] - a SHA-256 digesting sink whose `position()` fails loudly
//! - [`NullSink`] - discards everything but tracks position for size
//!   estimation
//!
//! The buffered file sink lives in the kernel crate's infrastructure layer
//! because it owns an open file handle.
//!
//! ## Contracts
//!
//! - All multi-byte integers are written most-significant-byte first.
//! - Floats are written as their IEEE-754 raw bit patterns.
//! - `put_utf8` writes the unprefixed UTF-8 bytes; callers who need a length
//!   prefix must write it first.
//! - No partial writes are observable after a successful `flush()`.

use sha2::{Digest, Sha256};

use crate::error::StoreError;

/// A destination for big-endian encoded bytes.
///
/// Only `put_u8`, `put_slice`, `position`, and `flush` are required; the
/// multi-byte put family is provided in terms of `put_slice`.
pub trait ByteSink {
    /// Writes a single byte.
    fn put_u8(&mut self, byte: u8) -> Result<(), StoreError>;

    /// Writes a run of bytes verbatim.
    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), StoreError>;

    /// The logical write position: bytes accepted so far, or for file-backed
    /// sinks the underlying offset plus unflushed bytes.
    fn position(&self) -> Result<u64, StoreError>;

    /// Drains any buffered bytes to the destination.
    fn flush(&mut self) -> Result<(), StoreError>;

    fn put_u16(&mut self, value: u16) -> Result<(), StoreError> {
        self.put_slice(&value.to_be_bytes())
    }

    fn put_i16(&mut self, value: i16) -> Result<(), StoreError> {
        self.put_slice(&value.to_be_bytes())
    }

    fn put_u32(&mut self, value: u32) -> Result<(), StoreError> {
        self.put_slice(&value.to_be_bytes())
    }

    fn put_u64(&mut self, value: u64) -> Result<(), StoreError> {
        self.put_slice(&value.to_be_bytes())
    }

    fn put_i32(&mut self, value: i32) -> Result<(), StoreError> {
        self.put_slice(&value.to_be_bytes())
    }

    fn put_i64(&mut self, value: i64) -> Result<(), StoreError> {
        self.put_slice(&value.to_be_bytes())
    }

    /// Writes the IEEE-754 raw bit pattern.
    fn put_f32(&mut self, value: f32) -> Result<(), StoreError> {
        self.put_u32(value.to_bits())
    }

    /// Writes the IEEE-754 raw bit pattern.
    fn put_f64(&mut self, value: f64) -> Result<(), StoreError> {
        self.put_u64(value.to_bits())
    }

    /// Writes the Unicode scalar value, big-endian.
    fn put_char(&mut self, value: char) -> Result<(), StoreError> {
        self.put_u32(value as u32)
    }

    /// Writes the unprefixed UTF-8 bytes of `value`.
    fn put_utf8(&mut self, value: &str) -> Result<(), StoreError> {
        self.put_slice(value.as_bytes())
    }
}

/// Growable heap destination.
#[derive(Debug, Default)]
pub struct HeapSink {
    buf: Vec<u8>,
}

impl HeapSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl ByteSink for HeapSink {
    fn put_u8(&mut self, byte: u8) -> Result<(), StoreError> {
        self.buf.push(byte);
        Ok(())
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn position(&self) -> Result<u64, StoreError> {
        Ok(self.buf.len() as u64)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Fixed-window destination over a caller-provided mutable slice.
///
/// Used for writing into pre-sized regions, including windows of writable
/// memory maps. Overflowing the window is an `IoError`.
pub struct SliceSink<'a> {
    window: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceSink<'a> {
    pub fn new(window: &'a mut [u8]) -> Self {
        Self { window, pos: 0 }
    }

    /// Bytes still writable in the window.
    pub fn remaining(&self) -> usize {
        self.window.len() - self.pos
    }
}

impl ByteSink for SliceSink<'_> {
    fn put_u8(&mut self, byte: u8) -> Result<(), StoreError> {
        self.put_slice(&[byte])
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        if bytes.len() > self.remaining() {
            return Err(StoreError::io_error(format!(
                "window overflow: {} bytes into a window with {} remaining",
                bytes.len(),
                self.remaining()
            )));
        }
        self.window[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    fn position(&self) -> Result<u64, StoreError> {
        Ok(self.pos as u64)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// SHA-256 digesting destination.
///
/// Every put is forwarded through the hash function. `position()` is
/// undefined for a hashing destination and fails loudly instead of returning
/// a fabricated offset.
#[derive(Default)]
pub struct HashSink {
    hasher: Sha256,
}

impl HashSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the sink and returns the 256-bit digest.
    pub fn finish(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }
}

impl ByteSink for HashSink {
    fn put_u8(&mut self, byte: u8) -> Result<(), StoreError> {
        self.hasher.update([byte]);
        Ok(())
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.hasher.update(bytes);
        Ok(())
    }

    fn position(&self) -> Result<u64, StoreError> {
        Err(StoreError::state_error("position() is undefined for a hashing sink"))
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Discards everything but still tracks `position()` so callers can estimate
/// encoded sizes without allocating.
#[derive(Debug, Default)]
pub struct NullSink {
    len: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteSink for NullSink {
    fn put_u8(&mut self, _byte: u8) -> Result<(), StoreError> {
        self.len += 1;
        Ok(())
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.len += bytes.len() as u64;
        Ok(())
    }

    fn position(&self) -> Result<u64, StoreError> {
        Ok(self.len)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
