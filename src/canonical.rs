//! Canonical serialization for graph fingerprints and policy hashes.
//!
//! Values are serialized to compact JSON and hashed with xxh64 (seed 0).
//! The hash is only stable if the serialized form is:
//!
//! - Struct fields in declaration order
//! - Sequences in index order
//! - Maps keyed through `BTreeMap`, never `HashMap`
//!
//! Floats go through serde_json's shortest round-trip formatting, so equal
//! thickness and position values always hash the same way.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to the canonical byte form.
///
/// Only types whose maps have non-string keys can fail to serialize; every
/// hashed type in this crate is a plain struct or sequence.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("hashed types serialize to JSON")
}

/// xxh64 of the canonical bytes.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// [`canonical_hash`] as 16 lowercase hex digits.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}
