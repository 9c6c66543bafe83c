//! A small ordered-scalar type for shard-key range boundaries and the
//! values extracted from documents to compare against them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A scalar field value, as pulled out of a document or a shard
/// boundary list. Deliberately narrow: documents carry richer types
/// (lists, nested dicts) but only scalars ever appear in a shard key.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Scalar {
    /// Attempts to read a `Scalar` out of an arbitrary JSON value,
    /// dropping anything that isn't a leaf scalar (lists/objects have
    /// no defined ordering and can't serve as shard-key components).
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Scalar::Int(i))
                } else {
                    n.as_f64().map(Scalar::Float)
                }
            }
            serde_json::Value::String(s) => Some(Scalar::Str(s.clone())),
            _ => None,
        }
    }

    /// Canonical byte representation, used for stable hashing. Kept
    /// independent of in-memory representation so the same logical
    /// value always hashes the same way regardless of Int/Float
    /// representation noise.
    pub fn stable_bytes(&self) -> Vec<u8> {
        match self {
            Scalar::Int(i) => format!("i:{i}").into_bytes(),
            Scalar::Float(f) => format!("f:{f}").into_bytes(),
            Scalar::Str(s) => format!("s:{s}").into_bytes(),
            Scalar::Bool(b) => format!("b:{b}").into_bytes(),
        }
    }

    /// Best-effort ordering across possibly-mismatched variants: same
    /// variant compares naturally, otherwise falls back to comparing
    /// the stable byte form. Shard-boundary lists are expected to be
    /// homogeneous in practice, but this never panics on a mismatch.
    pub fn cmp_scalar(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Scalar::Int(a), Scalar::Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Scalar::Float(a), Scalar::Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Scalar::Str(a), Scalar::Str(b)) => a.cmp(b),
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            _ => self.stable_bytes().cmp(&other.stable_bytes()),
        }
    }
}
