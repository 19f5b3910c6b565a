//! Values, type descriptors and the entry codec
//!
//! Keys and values stored in a prolly tree are [`Value`]s. Their total order
//! is the order used for sorting and binary search everywhere in the tree,
//! and their DAG-CBOR encoding is the canonical byte form that chunk
//! boundaries and content hashes are computed from.

use crate::prolly::Entry;
use crate::{CoreError, Result};
use cid::Cid;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tessera_blockstore::{create_cid, encode_ipld, CidCodec};

/// A value stored as a key or value in a collection
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    Ref(#[serde(with = "cid_serde")] Cid),
}

impl Value {
    /// The static type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::String(_) => ValueType::String,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Ref(_) => ValueType::Ref,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The referenced chunk, if this value is a ref
    pub fn as_cid(&self) -> Option<&Cid> {
        match self {
            Value::Ref(cid) => Some(cid),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) => 1,
            Value::String(_) => 2,
            Value::Bytes(_) => 3,
            Value::Ref(_) => 4,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Ref(a), Value::Ref(b)) => a.to_bytes().cmp(&b.to_bytes()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "bytes({})", b.len()),
            Value::Ref(cid) => write!(f, "ref({cid})"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Cid> for Value {
    fn from(cid: Cid) -> Self {
        Value::Ref(cid)
    }
}

/// Static element type of a key or value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int,
    String,
    Bytes,
    Ref,
    /// Accepts any value
    Any,
}

impl ValueType {
    /// Whether a value of type `actual` may be stored under this type
    pub fn accepts(&self, actual: ValueType) -> bool {
        *self == ValueType::Any || *self == actual
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::String => "string",
            ValueType::Bytes => "bytes",
            ValueType::Ref => "ref",
            ValueType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Whether a collection stores key/value pairs or bare keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    Map,
    Set,
}

/// Type descriptor attached to a collection and to every chunk it writes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionType {
    pub kind: CollectionKind,
    pub key: ValueType,
    pub value: ValueType,
}

impl CollectionType {
    /// A map from `key` to `value`
    pub fn map(key: ValueType, value: ValueType) -> Self {
        Self {
            kind: CollectionKind::Map,
            key,
            value,
        }
    }

    /// A set of `element`
    pub fn set(element: ValueType) -> Self {
        Self {
            kind: CollectionKind::Set,
            key: element,
            value: ValueType::Any,
        }
    }

    /// Reject keys of the wrong type
    pub fn check_key(&self, key: &Value) -> Result<()> {
        check(self.key, key)
    }

    /// Reject entries that do not fit this collection
    pub fn check_entry(&self, entry: &Entry) -> Result<()> {
        self.check_key(&entry.key)?;
        match (self.kind, &entry.value) {
            (CollectionKind::Map, Some(value)) => check(self.value, value),
            (CollectionKind::Set, None) => Ok(()),
            (CollectionKind::Map, None) => Err(CoreError::TypeMismatch {
                expected: format!("map entry with {} value", self.value),
                actual: "set element".to_string(),
            }),
            (CollectionKind::Set, Some(_)) => Err(CoreError::TypeMismatch {
                expected: "set element".to_string(),
                actual: "map entry".to_string(),
            }),
        }
    }
}

fn check(expected: ValueType, value: &Value) -> Result<()> {
    let actual = value.value_type();
    if expected.accepts(actual) {
        Ok(())
    } else {
        Err(CoreError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Total order on keys used for sorting and searching
pub fn compare_keys(a: &Value, b: &Value) -> Ordering {
    a.cmp(b)
}

/// Canonical bytes of an entry
pub fn encode_entry(entry: &Entry) -> Result<Vec<u8>> {
    Ok(encode_ipld(entry)?)
}

/// Content ref of canonical chunk bytes, identical to the block store's CID
pub fn ref_of(bytes: &[u8]) -> Cid {
    create_cid(bytes, CidCodec::DagCbor)
}

pub(crate) mod cid_serde {
    use cid::Cid;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(cid: &Cid, s: S) -> Result<S::Ok, S::Error> {
        cid.to_string().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Cid, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
