// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Checked big-endian reads over a byte window.
//!
//! [`ByteReader`] is the single source type: heap buffers and mapped files
//! both read through it as `&[u8]`, so decoding is uniform regardless of where
//! the bytes live. Every getter is bounds-checked and produces a
//! [`StoreError::DecodeError`] on underflow rather than panicking, because the
//! bytes under a reader are untrusted file content.

use crate::error::StoreError;

/// A cursor over a byte window with big-endian getters.
#[derive(Debug)]
pub struct ByteReader<'a> {
    window: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(window: &'a [u8]) -> Self {
        Self { window, pos: 0 }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.window.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Takes the next `len` bytes as a sub-window.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], StoreError> {
        if len > self.remaining() {
            return Err(StoreError::decode_error(format!(
                "window underflow: need {} bytes at offset {}, only {} remain",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let window = &self.window[self.pos..self.pos + len];
        self.pos += len;
        Ok(window)
    }

    pub fn get_u8(&mut self) -> Result<u8, StoreError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, StoreError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn get_i16(&mut self) -> Result<i16, StoreError> {
        Ok(self.get_u16()? as i16)
    }

    pub fn get_u32(&mut self) -> Result<u32, StoreError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn get_u64(&mut self) -> Result<u64, StoreError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }

    pub fn get_i32(&mut self) -> Result<i32, StoreError> {
        Ok(self.get_u32()? as i32)
    }

    pub fn get_i64(&mut self) -> Result<i64, StoreError> {
        Ok(self.get_u64()? as i64)
    }

    pub fn get_f32(&mut self) -> Result<f32, StoreError> {
        Ok(f32::from_bits(self.get_u32()?))
    }

    pub fn get_f64(&mut self) -> Result<f64, StoreError> {
        Ok(f64::from_bits(self.get_u64()?))
    }

    /// Fails unless the window has been consumed exactly.
    pub fn expect_end(&self) -> Result<(), StoreError> {
        if self.remaining() != 0 {
            return Err(StoreError::decode_error(format!(
                "{} trailing bytes after a complete decode",
                self.remaining()
            )));
        }
        Ok(())
    }
}
