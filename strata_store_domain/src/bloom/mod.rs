// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bloom Filter
//!
//! Persistent approximate membership for [`Composite`] keys. Every chunk
//! carries one; a `might_contain` miss proves the chunk cannot hold the key,
//! so the read path skips the manifest and the mapped file entirely.
//!
//! ## Sizing
//!
//! The bit array is sized from `expected_insertions` at a target false
//! positive rate (3% by default): `m = -n * ln(p) / (ln 2)^2` bits and
//! `k = (m / n) * ln 2` hash functions, with `k` clamped to `1..=16` and `m`
//! rounded up to whole 64-bit words.
//!
//! ## Hashing
//!
//! Two independent 64-bit xxh3 hashes (distinct seeds) over the Composite's
//! stored bytes, combined by double hashing: bit `i` is
//! `(h1 + i * h2) mod m`. The funnel - the rule mapping an entity to hashed
//! bytes - is identified by a byte in the persistent header so a file written
//! under an older funnel is never silently misread.
//!
//! ## Concurrency
//!
//! The bit array is `AtomicU64` words: readers never tear, concurrent writers
//! race benignly (both set their bits). Callers that serialize access anyway
//! (the mutable chunk holds its own write lock) pay only the uncontended
//! atomic cost.
//!
//! ## Guarantees
//!
//! Zero false negatives: after `put(x)` returns, `might_contain(x)` is true
//! for the life of the filter, including across a persistence round-trip.

use std::sync::atomic::{AtomicU64, Ordering};

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::byteable::ByteReader;
use crate::error::StoreError;
use crate::value_objects::Composite;

/// Default target false-positive rate.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.03;

const MAGIC: [u8; 4] = *b"SBLM";
const FORMAT_VERSION: u8 = 1;
/// Funnel id written by retired builds; remapped on load.
const FUNNEL_LEGACY: u8 = 0;
/// Current funnel: the Composite's stored bytes fed to seeded xxh3.
const FUNNEL_COMPOSITE_BYTES: u8 = 1;
const HEADER_SIZE: usize = 4 + 1 + 1 + 4 + 1 + 8;

const H1_SEED: u64 = 0x5354_5241_5441_0001;
const H2_SEED: u64 = 0x5354_5241_5441_0002;

/// Approximate membership filter over Composite keys.
pub struct BloomFilter {
    words: Box<[AtomicU64]>,
    num_bits: u64,
    num_hashes: u32,
    expected_insertions: u32,
    upgraded: bool,
}

impl BloomFilter {
    /// Creates a filter sized for `expected_insertions` at the default 3%
    /// false-positive rate.
    pub fn with_expected_insertions(expected_insertions: u32) -> Self {
        Self::with_capacity(expected_insertions, DEFAULT_FALSE_POSITIVE_RATE)
    }

    /// Creates a filter sized for `expected_insertions` at `fp_rate`.
    pub fn with_capacity(expected_insertions: u32, fp_rate: f64) -> Self {
        let fp_rate = fp_rate.clamp(1e-10, 0.5);
        let n = expected_insertions.max(1) as f64;

        let ln2 = std::f64::consts::LN_2;
        let m = (-n * fp_rate.ln() / (ln2 * ln2)).ceil() as u64;
        let m = m.max(64);

        let k = ((m as f64 / n) * ln2).ceil() as u32;
        let k = k.clamp(1, 16);

        let num_words = m.div_ceil(64) as usize;
        let num_bits = (num_words as u64) * 64;
        let words: Vec<AtomicU64> = (0..num_words).map(|_| AtomicU64::new(0)).collect();

        Self {
            words: words.into_boxed_slice(),
            num_bits,
            num_hashes: k,
            expected_insertions: expected_insertions.max(1),
            upgraded: false,
        }
    }

    /// Records `composite`. Returns true iff any bit flipped; false means the
    /// key was possibly already present.
    pub fn put(&self, composite: &Composite) -> bool {
        self.put_bytes(composite.as_bytes())
    }

    /// Tests `composite`. False is authoritative; true may be spurious.
    pub fn might_contain(&self, composite: &Composite) -> bool {
        self.might_contain_bytes(composite.as_bytes())
    }

    /// Raw-bytes variant of [`BloomFilter::put`], for callers whose keys are
    /// not Composites (the corpus deduplicator hashes substring content).
    pub fn put_bytes(&self, bytes: &[u8]) -> bool {
        let mut flipped = false;
        for bit in self.bit_indexes(bytes) {
            let word = (bit / 64) as usize;
            let mask = 1u64 << (bit % 64);
            let previous = self.words[word].fetch_or(mask, Ordering::Relaxed);
            flipped |= previous & mask == 0;
        }
        flipped
    }

    /// Raw-bytes variant of [`BloomFilter::might_contain`].
    pub fn might_contain_bytes(&self, bytes: &[u8]) -> bool {
        self.bit_indexes(bytes).all(|bit| {
            let word = (bit / 64) as usize;
            let mask = 1u64 << (bit % 64);
            self.words[word].load(Ordering::Relaxed) & mask != 0
        })
    }

    fn bit_indexes(&self, bytes: &[u8]) -> impl Iterator<Item = u64> + '_ {
        let h1 = xxh3_64_with_seed(bytes, H1_SEED);
        let h2 = xxh3_64_with_seed(bytes, H2_SEED);
        let num_bits = self.num_bits;
        (0..self.num_hashes as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % num_bits)
    }

    /// Fraction of bits set.
    pub fn saturation(&self) -> f64 {
        let ones: u64 = self.words.iter().map(|word| word.load(Ordering::Relaxed).count_ones() as u64).sum();
        ones as f64 / self.num_bits as f64
    }

    /// True once the estimated insertion count exceeds the design bound.
    ///
    /// The estimate inverts the expected-saturation formula:
    /// `n_est = -(m / k) * ln(1 - ones/m)`.
    pub fn is_saturated(&self) -> bool {
        let fill = self.saturation();
        if fill >= 1.0 {
            return true;
        }
        let estimated = -(self.num_bits as f64 / self.num_hashes as f64) * (1.0 - fill).ln();
        estimated > self.expected_insertions as f64
    }

    /// True when this filter was loaded from a file carrying the legacy
    /// funnel tag; the caller should rewrite it under the current funnel.
    pub fn upgraded(&self) -> bool {
        self.upgraded
    }

    pub fn bit_count(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    pub fn expected_insertions(&self) -> u32 {
        self.expected_insertions
    }

    /// Serializes the configuration header and packed bit array.
    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.words.len() * 8);
        bytes.extend_from_slice(&MAGIC);
        bytes.push(FORMAT_VERSION);
        bytes.push(FUNNEL_COMPOSITE_BYTES);
        bytes.extend_from_slice(&self.expected_insertions.to_be_bytes());
        bytes.push(self.num_hashes as u8);
        bytes.extend_from_slice(&self.num_bits.to_be_bytes());
        for word in self.words.iter() {
            bytes.extend_from_slice(&word.load(Ordering::Relaxed).to_be_bytes());
        }
        bytes
    }

    /// Restores a filter from [`BloomFilter::get_bytes`] output.
    ///
    /// Exactly one legacy funnel id is remapped to the current funnel (and
    /// flagged via [`BloomFilter::upgraded`]); any other funnel or format
    /// version is rejected outright rather than guessed at.
    pub fn load(bytes: &[u8]) -> Result<Self, StoreError> {
        let mut reader = ByteReader::new(bytes);
        let magic = reader.take(4)?;
        if magic != MAGIC {
            return Err(StoreError::state_error(format!(
                "bloom filter magic mismatch: expected {:02x?}, found {:02x?}",
                MAGIC, magic
            )));
        }
        let version = reader.get_u8()?;
        if version != FORMAT_VERSION {
            return Err(StoreError::state_error(format!(
                "unsupported bloom filter format version {}",
                version
            )));
        }
        let funnel = reader.get_u8()?;
        let upgraded = match funnel {
            FUNNEL_COMPOSITE_BYTES => false,
            FUNNEL_LEGACY => true,
            other => {
                return Err(StoreError::state_error(format!("unknown bloom funnel id {}", other)));
            }
        };
        let expected_insertions = reader.get_u32()?;
        let num_hashes = reader.get_u8()? as u32;
        if num_hashes == 0 || num_hashes > 16 {
            return Err(StoreError::decode_error(format!("invalid hash count {}", num_hashes)));
        }
        let num_bits = reader.get_u64()?;
        if num_bits == 0 || num_bits % 64 != 0 {
            return Err(StoreError::decode_error(format!("invalid bit count {}", num_bits)));
        }
        let num_words = (num_bits / 64) as usize;
        if reader.remaining() != num_words * 8 {
            return Err(StoreError::decode_error(format!(
                "bit array truncated: expected {} bytes, found {}",
                num_words * 8,
                reader.remaining()
            )));
        }
        let mut words = Vec::with_capacity(num_words);
        for _ in 0..num_words {
            words.push(AtomicU64::new(reader.get_u64()?));
        }
        Ok(Self {
            words: words.into_boxed_slice(),
            num_bits,
            num_hashes,
            expected_insertions: expected_insertions.max(1),
            upgraded,
        })
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("bits", &self.num_bits)
            .field("hashes", &self.num_hashes)
            .field("expected_insertions", &self.expected_insertions)
            .field("saturation", &self.saturation())
            .finish()
    }
}
