//! Record keys and their order-preserving byte encoding.
//!
//! Keys follow the host object-store rules: numbers, strings, binary blobs and
//! arrays of keys are valid; booleans, null and objects are not. Keys of different
//! kinds order as numbers < strings < binary < arrays.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

/// Largest integer a key number holds without losing precision (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

const TAG_NUMBER: u8 = 0x10;
const TAG_STRING: u8 = 0x20;
const TAG_BINARY: u8 = 0x30;
const TAG_ARRAY: u8 = 0x40;
const ARRAY_END: u8 = 0x00;

#[derive(Debug, Clone)]
pub enum Key {
    /// Build through [`Key::number`] or [`Key::from_json`], which reject NaN.
    Number(f64),
    String(String),
    Binary(Vec<u8>),
    Array(Vec<Key>),
}

impl Key {
    /// A number key. NaN is not a valid key and yields `None`.
    pub fn number(n: f64) -> Option<Key> { (!n.is_nan()).then_some(Key::Number(n)) }

    /// Interpret a JSON field value as a key. Returns `None` for values that are not valid keys.
    pub fn from_json(value: &Value) -> Option<Key> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if !(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&i) {
                        tracing::warn!("integer key {} exceeds the safe range, precision loss will occur", i);
                    }
                }
                n.as_f64().map(Key::Number)
            }
            Value::String(s) => Some(Key::String(s.clone())),
            Value::Array(items) => items.iter().map(Key::from_json).collect::<Option<Vec<_>>>().map(Key::Array),
            Value::Null | Value::Bool(_) | Value::Object(_) => None,
        }
    }

    /// JSON rendering of the key. Binary keys become arrays of byte values.
    pub fn to_json(&self) -> Value {
        match self {
            Key::Number(n) => serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            Key::String(s) => Value::String(s.clone()),
            Key::Binary(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            Key::Array(items) => Value::Array(items.iter().map(Key::to_json).collect()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Key::Number(_) => TAG_NUMBER,
            Key::String(_) => TAG_STRING,
            Key::Binary(_) => TAG_BINARY,
            Key::Array(_) => TAG_ARRAY,
        }
    }

    /// Order-preserving, self-delimiting byte encoding.
    ///
    /// For any two keys `a < b` implies `a.encode() < b.encode()` bytewise, and no
    /// encoding is a proper prefix of another, so encodings can be concatenated into
    /// composite keys and scanned by prefix.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.rank());
        match self {
            Key::Number(n) => out.extend_from_slice(&collate_f64(*n)),
            Key::String(s) => escape_into(s.as_bytes(), out),
            Key::Binary(bytes) => escape_into(bytes, out),
            Key::Array(items) => {
                for item in items {
                    item.encode_into(out);
                }
                out.push(ARRAY_END);
            }
        }
    }
}

/// IEEE 754 bits rearranged so that unsigned byte order matches numeric order.
fn collate_f64(f: f64) -> [u8; 8] {
    // -0.0 and 0.0 are the same key
    let f = if f == 0.0 { 0.0 } else { f };
    let bits = f.to_bits();
    let bits = if f.is_sign_negative() { !bits } else { bits ^ (1 << 63) };
    bits.to_be_bytes()
}

/// Variable-width payload: 0x00 is escaped as 0x00 0xFF, terminated by 0x00 0x01.
fn escape_into(bytes: &[u8], out: &mut Vec<u8>) {
    out.reserve(bytes.len() + 2);
    for &b in bytes {
        out.push(b);
        if b == 0x00 {
            out.push(0xFF);
        }
    }
    out.push(0x00);
    out.push(0x01);
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) => collate_f64(*a).cmp(&collate_f64(*b)),
            (Key::String(a), Key::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Key::Binary(a), Key::Binary(b)) => a.cmp(b),
            (Key::Array(a), Key::Array(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for Key {}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "{}", n),
            Key::String(s) => write!(f, "{:?}", s),
            Key::Binary(bytes) => {
                write!(f, "0x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Key::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self { Key::String(s.to_owned()) }
}

impl From<String> for Key {
    fn from(s: String) -> Self { Key::String(s) }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self { Key::String(s.clone()) }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self { Key::Number(n as f64) }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self { Key::Number(n as f64) }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self { Key::Number(n as f64) }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self { Key::Binary(bytes) }
}

impl From<Vec<Key>> for Key {
    fn from(items: Vec<Key>) -> Self { Key::Array(items) }
}
