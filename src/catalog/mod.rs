//! Read-only catalog input: collections and their per-field statistics.
//!
//! The catalog is produced by an external collaborator (schema
//! extraction / trace ingestion, both out of scope here) and consumed
//! read-only by every component in this crate.

mod field;
mod scalar;

pub use field::{Field, FieldType};
pub use scalar::Scalar;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `_id` is implicit on every document and is skipped by catalog
/// extractors; it never appears as a candidate field.
pub const ID_FIELD: &str = "_id";

/// Per-field denormalization hint carried alongside the field's
/// statistics (see `Field::parent_col`/`parent_key`/`parent_conf`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Collection {
    pub name: String,
    pub doc_count: u64,
    pub avg_doc_size: u64,
    /// Fraction of total workload operations touching this collection.
    /// Across all collections in a catalog these should sum to ~1.0;
    /// the advisor does not enforce this, it only trusts the input.
    pub workload_percent: f64,
    #[serde(default)]
    pub fields: HashMap<String, Field>,
    /// Fields referenced by the workload — the candidate pool for
    /// shard keys / indexes (see DesignCandidates, §4.J).
    #[serde(default)]
    pub interesting: Vec<String>,
}

impl Collection {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// 2 * doc_count: the number of pages needed for a worst-case full
    /// scan, doubled to model eviction churn during the scan (§4.E).
    pub fn fullscan_pages(&self) -> u64 {
        self.doc_count.saturating_mul(2)
    }
}

/// The full collection catalog, keyed by collection name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Catalog {
    collections: HashMap<String, Collection>,
}

impl Catalog {
    pub fn new(collections: Vec<Collection>) -> Self {
        Self {
            collections: collections.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        let collections: Vec<Collection> = serde_json::from_str(data)?;
        Ok(Self::new(collections))
    }

    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

#[cfg(test)]
mod catalog_test {
    use super::*;

    fn sample_collection() -> Collection {
        Collection {
            name: "users".to_string(),
            doc_count: 1000,
            avg_doc_size: 256,
            workload_percent: 1.0,
            fields: HashMap::new(),
            interesting: vec![],
        }
    }

    #[test]
    fn fullscan_pages_doubles_doc_count() {
        let c = sample_collection();
        assert_eq!(c.fullscan_pages(), 2000);
    }

    #[test]
    fn catalog_lookup_by_name() {
        let cat = Catalog::new(vec![sample_collection()]);
        assert!(cat.contains("users"));
        assert!(cat.get("orders").is_none());
        assert_eq!(cat.len(), 1);
    }
}
