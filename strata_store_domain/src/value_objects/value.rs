// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Value Value Object
//!
//! The tagged union stored against a record's fields: booleans, 32/64-bit
//! integers, floats, doubles, strings, and links to other records. The binary
//! form is a 1-byte type tag followed by the natural big-endian encoding of
//! the payload.
//!
//! ## Canonical Form
//!
//! Two `Value`s are equal iff their canonical bytes match. For most variants
//! the canonical bytes are the transport bytes; integers are the exception:
//! a `Long` whose payload fits in 32 bits is canonically an `Int`, so `1i64`
//! and `1i32` compare equal and hash identically. [`Value::optimize`]
//! performs that width normalization and is applied by every constructor on
//! this type; decoding is deliberately verbatim so that transport bytes
//! round-trip untouched.
//!
//! ## Ordering
//!
//! The total order is derived from `(type tag, canonical form)`: values of
//! different canonical tags order by tag; values of the same tag order
//! naturally (numerically for numbers, with `total_cmp` for floats so NaN has
//! a defined position; lexicographically for strings).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::byteable::{ByteReader, ByteSink, Byteable, FromBytes};
use crate::error::StoreError;
use crate::value_objects::{Identifier, Text};

const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_LONG: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_DOUBLE: u8 = 5;
const TAG_STRING: u8 = 6;
const TAG_LINK: u8 = 7;

/// A dynamically typed field value.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Text),
    Link(Identifier),
}

impl Value {
    /// Width-normalizes integer storage: a `Long` that fits in 32 bits
    /// becomes an `Int`. All other variants pass through.
    pub fn optimize(self) -> Self {
        match self {
            Value::Long(x) if i32::try_from(x).is_ok() => Value::Int(x as i32),
            other => other,
        }
    }

    /// The 1-byte type tag of the transport form.
    pub fn tag(&self) -> u8 {
        match self {
            Value::Bool(_) => TAG_BOOL,
            Value::Int(_) => TAG_INT,
            Value::Long(_) => TAG_LONG,
            Value::Float(_) => TAG_FLOAT,
            Value::Double(_) => TAG_DOUBLE,
            Value::String(_) => TAG_STRING,
            Value::Link(_) => TAG_LINK,
        }
    }

    /// The width-normalized form used for equality, ordering, and hashing.
    fn canonical(&self) -> Value {
        self.clone().optimize()
    }

    /// The string payload, if this value is a string.
    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    fn payload_size(&self) -> usize {
        match self {
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 4,
            Value::Long(_) | Value::Double(_) => 8,
            Value::String(text) => text.len(),
            Value::Link(_) => 8,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v).optimize()
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Text::new(v))
    }
}

impl From<Text> for Value {
    fn from(v: Text) -> Self {
        Value::String(v)
    }
}

impl From<Identifier> for Value {
    fn from(v: Identifier) -> Self {
        Value::Link(v)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.canonical(), other.canonical()) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            // Bit equality, matching canonical-byte equality: NaN payloads
            // are distinguished, -0.0 != 0.0 is NOT the case here because
            // their bit patterns differ.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Link(a), Value::Link(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.canonical(), other.canonical());
        match (&a, &b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Int(x), Value::Int(y)) => x.cmp(y),
            (Value::Long(x), Value::Long(y)) => x.cmp(y),
            (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
            (Value::Double(x), Value::Double(y)) => x.total_cmp(y),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Link(x), Value::Link(y)) => x.cmp(y),
            _ => a.tag().cmp(&b.tag()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.canonical() {
            Value::Bool(x) => (TAG_BOOL, x).hash(state),
            Value::Int(x) => (TAG_INT, x).hash(state),
            Value::Long(x) => (TAG_LONG, x).hash(state),
            Value::Float(x) => (TAG_FLOAT, x.to_bits()).hash(state),
            Value::Double(x) => (TAG_DOUBLE, x.to_bits()).hash(state),
            Value::String(x) => (TAG_STRING, x).hash(state),
            Value::Link(x) => (TAG_LINK, x).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(x) => write!(f, "{}", x),
            Value::Int(x) => write!(f, "{}", x),
            Value::Long(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::String(x) => write!(f, "\"{}\"", x),
            Value::Link(x) => write!(f, "@{}", x.value()),
        }
    }
}

impl Byteable for Value {
    fn size(&self) -> usize {
        1 + self.payload_size()
    }

    fn copy_to(&self, sink: &mut dyn ByteSink) -> Result<(), StoreError> {
        sink.put_u8(self.tag())?;
        match self {
            Value::Bool(x) => sink.put_u8(u8::from(*x)),
            Value::Int(x) => sink.put_i32(*x),
            Value::Long(x) => sink.put_i64(*x),
            Value::Float(x) => sink.put_f32(*x),
            Value::Double(x) => sink.put_f64(*x),
            Value::String(x) => sink.put_utf8(x.as_str()),
            Value::Link(x) => sink.put_u64(x.value()),
        }
    }

    fn canonical_bytes(&self) -> Result<Vec<u8>, StoreError> {
        self.canonical().to_bytes()
    }
}

impl FromBytes for Value {
    fn read_from(window: &[u8]) -> Result<Self, StoreError> {
        let mut reader = ByteReader::new(window);
        let tag = reader.get_u8()?;
        let value = match tag {
            TAG_BOOL => match reader.get_u8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(StoreError::decode_error(format!("invalid boolean payload {:#04x}", other)));
                }
            },
            TAG_INT => Value::Int(reader.get_i32()?),
            TAG_LONG => Value::Long(reader.get_i64()?),
            TAG_FLOAT => Value::Float(reader.get_f32()?),
            TAG_DOUBLE => Value::Double(reader.get_f64()?),
            TAG_STRING => Value::String(Text::read_from(reader.take(reader.remaining())?)?),
            TAG_LINK => Value::Link(Identifier::new(reader.get_u64()?)),
            other => {
                return Err(StoreError::decode_error(format!("unknown value type tag {:#04x}", other)));
            }
        };
        reader.expect_end()?;
        Ok(value)
    }
}
