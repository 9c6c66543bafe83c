//! Per-collection candidate domains for shard keys, indexes, and
//! denormalization parents, derived from the catalog (§4.J).

use crate::catalog::{Catalog, Field};
use std::collections::{BTreeSet, HashMap};

/// Fields below this selectivity are never offered as shard-key or
/// index candidates.
pub const MIN_SELECTIVITY: f64 = 0.1;

#[derive(Debug, Clone, Default)]
pub struct CollectionCandidates {
    pub shard_key_fields: Vec<String>,
    pub index_fields: Vec<String>,
    pub denorm_parents: Vec<String>,
}

/// The candidate domains for every collection in a catalog, keyed by
/// name, plus a deterministic iteration order for the search.
#[derive(Debug, Clone, Default)]
pub struct DesignCandidates {
    order: Vec<String>,
    per_collection: HashMap<String, CollectionCandidates>,
}

impl DesignCandidates {
    /// Builds candidate domains from each collection's `interesting`
    /// field list (filtered by minimum selectivity and cardinality) and
    /// its fields' `parent_col` denormalization hints, including nested
    /// fields of embedded documents.
    pub fn derive(catalog: &Catalog) -> Self {
        let mut order: Vec<String> = catalog.names().map(|s| s.to_string()).collect();
        order.sort();

        let mut per_collection = HashMap::new();
        for name in &order {
            let collection = catalog.get(name).expect("name came from catalog.names()");

            let mut eligible: BTreeSet<String> = BTreeSet::new();
            for field_name in &collection.interesting {
                if let Some(field) = collection.field(field_name) {
                    if field.selectivity >= MIN_SELECTIVITY && field.cardinality > 1 {
                        eligible.insert(field_name.clone());
                    }
                }
            }
            let shard_key_fields: Vec<String> = eligible.iter().cloned().collect();
            let index_fields = shard_key_fields.clone();

            let mut denorm_parents: BTreeSet<String> = BTreeSet::new();
            collect_parent_hints(&collection.fields, &mut denorm_parents);
            denorm_parents.remove(name);

            per_collection.insert(
                name.clone(),
                CollectionCandidates {
                    shard_key_fields,
                    index_fields,
                    denorm_parents: denorm_parents.into_iter().collect(),
                },
            );
        }

        Self { order, per_collection }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn for_collection(&self, name: &str) -> CollectionCandidates {
        self.per_collection.get(name).cloned().unwrap_or_default()
    }
}

fn collect_parent_hints(fields: &HashMap<String, Field>, out: &mut BTreeSet<String>) {
    for field in fields.values() {
        if let Some(parent) = &field.parent_col {
            if !parent.is_empty() {
                out.insert(parent.clone());
            }
        }
        if !field.fields.is_empty() {
            collect_parent_hints(&field.fields, out);
        }
    }
}

#[cfg(test)]
mod candidates_test {
    use super::*;
    use crate::catalog::{Collection, FieldType};
    use std::collections::HashMap;

    fn field(selectivity: f64, cardinality: u64, parent_col: Option<&str>) -> Field {
        Field {
            field_type: FieldType::Int,
            cardinality,
            selectivity,
            avg_size: 8,
            ranges: vec![],
            fields: HashMap::new(),
            parent_col: parent_col.map(|s| s.to_string()),
            parent_key: None,
            parent_conf: None,
        }
    }

    #[test]
    fn low_selectivity_fields_are_excluded() {
        let mut fields = HashMap::new();
        fields.insert("a".to_string(), field(0.5, 100, None));
        fields.insert("b".to_string(), field(0.01, 100, None));
        let catalog = Catalog::new(vec![Collection {
            name: "c".to_string(),
            doc_count: 10,
            avg_doc_size: 64,
            workload_percent: 1.0,
            fields,
            interesting: vec!["a".to_string(), "b".to_string()],
        }]);
        let candidates = DesignCandidates::derive(&catalog);
        let c = candidates.for_collection("c");
        assert_eq!(c.shard_key_fields, vec!["a".to_string()]);
    }

    #[test]
    fn parent_col_hints_become_denorm_candidates() {
        let mut fields = HashMap::new();
        fields.insert("owner_id".to_string(), field(0.9, 50, Some("users")));
        let catalog = Catalog::new(vec![Collection {
            name: "orders".to_string(),
            doc_count: 10,
            avg_doc_size: 64,
            workload_percent: 1.0,
            fields,
            interesting: vec![],
        }]);
        let candidates = DesignCandidates::derive(&catalog);
        let c = candidates.for_collection("orders");
        assert_eq!(c.denorm_parents, vec!["users".to_string()]);
    }

    #[test]
    fn unknown_collection_returns_empty_candidates() {
        let catalog = Catalog::new(vec![]);
        let candidates = DesignCandidates::derive(&catalog);
        let c = candidates.for_collection("ghost");
        assert!(c.shard_key_fields.is_empty());
        assert!(c.denorm_parents.is_empty());
    }
}
