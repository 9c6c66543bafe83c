//! Per-field statistics carried by the catalog.

use super::Scalar;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scalar type tag as produced by schema extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Long,
    Float,
    Bool,
    Str,
    Datetime,
    List,
    Dict,
}

/// Statistics and denormalization hints for a single field, possibly
/// nested (embedded documents/lists carry their own `fields` map).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub cardinality: u64,
    #[serde(default)]
    pub selectivity: f64,
    #[serde(default)]
    pub avg_size: u64,
    /// Sorted shard boundaries, if explicitly supplied; empty means
    /// "fall back to stable_hash(value) mod N" (§4.C).
    #[serde(default)]
    pub ranges: Vec<Scalar>,
    /// Nested fields for embedded documents/lists.
    #[serde(default)]
    pub fields: HashMap<String, Field>,
    /// Candidate parent collection for denormalizing this field's
    /// owning collection into `parent_col`, keyed on `parent_key`.
    #[serde(default)]
    pub parent_col: Option<String>,
    #[serde(default)]
    pub parent_key: Option<String>,
    /// Confidence/embedding ratio in [0,1] for this denormalization
    /// candidate; consumed by the disk component's slot-size model.
    #[serde(default)]
    pub parent_conf: Option<f64>,
}

impl Field {
    /// Binary-searches the field's `ranges` for the bucket containing
    /// `value`, falling back to hashing when no ranges are defined.
    /// Mirrors `computeTouchedRange` from the original cost model.
    pub fn range_bucket(&self, value: &Scalar, num_nodes: usize) -> usize {
        if num_nodes == 0 {
            return 0;
        }
        if self.ranges.is_empty() {
            let h = crate::estimator::hashing::stable_hash(&value.stable_bytes());
            return (h as usize) % num_nodes;
        }
        let mut index = 0usize;
        while index < self.ranges.len() {
            if index == self.ranges.len() - 1 {
                return index % num_nodes;
            }
            let lo = &self.ranges[index];
            let hi = &self.ranges[index + 1];
            let at_least_lo = lo.cmp_scalar(value) != std::cmp::Ordering::Greater;
            let less_than_hi = value.cmp_scalar(hi) == std::cmp::Ordering::Less;
            if at_least_lo && less_than_hi {
                return index % num_nodes;
            }
            index += 1;
        }
        index % num_nodes
    }
}

#[cfg(test)]
mod field_test {
    use super::*;

    fn field_with_ranges(ranges: Vec<i64>) -> Field {
        Field {
            field_type: FieldType::Int,
            cardinality: 0,
            selectivity: 0.0,
            avg_size: 8,
            ranges: ranges.into_iter().map(Scalar::Int).collect(),
            fields: HashMap::new(),
            parent_col: None,
            parent_key: None,
            parent_conf: None,
        }
    }

    #[test]
    fn range_bucket_without_ranges_hashes_deterministically() {
        let f = field_with_ranges(vec![]);
        let a = f.range_bucket(&Scalar::Int(42), 4);
        let b = f.range_bucket(&Scalar::Int(42), 4);
        assert_eq!(a, b);
        assert!(a < 4);
    }

    #[test]
    fn range_bucket_with_explicit_boundaries() {
        let f = field_with_ranges(vec![0, 10, 20]);
        assert_eq!(f.range_bucket(&Scalar::Int(5), 3), 0);
        assert_eq!(f.range_bucket(&Scalar::Int(15), 3), 1);
        assert_eq!(f.range_bucket(&Scalar::Int(25), 3), 2);
    }
}
