//! A single typed operation within a session.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Operation kind (§3 Operation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpType {
    Query,
    Insert,
    Update,
    Delete,
}

/// Predicate kind on a referenced field (§6: `eq`, `range`, `regex`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredicateType {
    #[serde(rename = "eq")]
    Equality,
    #[serde(rename = "range")]
    Range,
    #[serde(rename = "regex")]
    Regex,
}

/// A typed client operation (§3 Operation).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Operation {
    pub query_id: u64,
    /// 64-bit content-derived hash, used as the cache key for
    /// per-query-shape memoization in the cost model.
    pub query_hash: u64,
    pub collection: String,
    #[serde(rename = "type")]
    pub op_type: OpType,
    #[serde(default)]
    pub predicates: HashMap<String, PredicateType>,
    /// One or more documents/filters: a single filter doc for
    /// query/update/delete, possibly several documents for a batch
    /// insert.
    #[serde(default)]
    pub query_content: Vec<serde_json::Value>,
    /// Projection fields, if any (query operations only).
    #[serde(default)]
    pub query_fields: Vec<String>,
    pub query_time: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub resp_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub upsert: bool,
    #[serde(default)]
    pub multi: bool,
}

impl Operation {
    /// Fields this operation references: predicate fields unioned
    /// with projection fields. Used by `guessIndex` and by the
    /// shard-key-coverage check in `NodeEstimator`.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.predicates.keys().map(|s| s.as_str()).collect();
        for f in &self.query_fields {
            if !fields.contains(&f.as_str()) {
                fields.push(f.as_str());
            }
        }
        fields
    }

    /// True if any predicate on this operation is a REGEX predicate.
    pub fn is_regex(&self) -> bool {
        self.predicates.values().any(|p| *p == PredicateType::Regex)
    }

    /// Extracts the scalar values of `fields`, in order, from every
    /// content document. Returns one `Vec<Scalar>` per document;
    /// documents missing a field contribute a shorter vector (callers
    /// treat a length mismatch as "can't compute a shard value").
    pub fn field_values<'a>(&'a self, fields: &[String]) -> Vec<Vec<crate::catalog::Scalar>> {
        self.query_content
            .iter()
            .map(|doc| {
                fields
                    .iter()
                    .filter_map(|f| doc.get(f).and_then(crate::catalog::Scalar::from_json))
                    .collect()
            })
            .collect()
    }

    /// All scalar leaf values across a content document, in a stable
    /// (sorted-key) order — used to compute the collection-fetch
    /// document id when no index covers the operation.
    pub fn all_scalar_values(doc: &serde_json::Value) -> Vec<crate::catalog::Scalar> {
        let mut out = Vec::new();
        if let serde_json::Value::Object(map) = doc {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for k in keys {
                if let Some(s) = crate::catalog::Scalar::from_json(&map[k]) {
                    out.push(s);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod operation_test {
    use super::*;

    fn sample_op() -> Operation {
        let mut predicates = HashMap::new();
        predicates.insert("a".to_string(), PredicateType::Equality);
        Operation {
            query_id: 1,
            query_hash: 42,
            collection: "c".to_string(),
            op_type: OpType::Query,
            predicates,
            query_content: vec![serde_json::json!({"a": 1, "b": 2})],
            query_fields: vec!["b".to_string()],
            query_time: chrono::Utc::now(),
            resp_time: None,
            upsert: false,
            multi: false,
        }
    }

    #[test]
    fn referenced_fields_union_predicates_and_projection() {
        let op = sample_op();
        let mut refs = op.referenced_fields();
        refs.sort();
        assert_eq!(refs, vec!["a", "b"]);
    }

    #[test]
    fn all_scalar_values_sorted_by_key() {
        let doc = serde_json::json!({"z": 1, "a": 2});
        let values = Operation::all_scalar_values(&doc);
        assert_eq!(values, vec![crate::catalog::Scalar::Int(2), crate::catalog::Scalar::Int(1)]);
    }
}
