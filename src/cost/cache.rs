//! Per-collection memoization cache shared by the three cost
//! components and owned by `CostModel` (§4.H).

use crate::histogram::Histogram;
use std::collections::{BTreeSet, HashMap};

#[derive(Default)]
struct PerCollectionCache {
    best_index: HashMap<u64, (Option<Vec<String>>, bool)>,
    op_regex: HashMap<u64, bool>,
    op_node_ids: HashMap<u64, BTreeSet<usize>>,
    collection_doc_ids: HashMap<u64, Vec<u64>>,
    index_doc_ids: HashMap<u64, Vec<u64>>,
}

/// The five memoization slots from §4.H, scoped per collection so a
/// design change on one collection only invalidates that collection's
/// entries. Also carries the cache hit/miss diagnostics recovered from
/// `original_source/` (SPEC_FULL §4 supplement).
#[derive(Default)]
pub struct QueryCache {
    collections: HashMap<String, PerCollectionCache>,
    pub hit_ctr: Histogram<&'static str>,
    pub miss_ctr: Histogram<&'static str>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every slot for `collection`.
    pub fn invalidate(&mut self, collection: &str) {
        self.collections.remove(collection);
    }

    pub fn clear(&mut self) {
        self.collections.clear();
    }

    fn slot(&mut self, collection: &str) -> &mut PerCollectionCache {
        self.collections.entry(collection.to_string()).or_default()
    }

    pub fn best_index(&mut self, collection: &str, query_hash: u64, compute: impl FnOnce() -> (Option<Vec<String>>, bool)) -> (Option<Vec<String>>, bool) {
        if let Some(v) = self.slot(collection).best_index.get(&query_hash) {
            self.hit_ctr.put("best_index");
            return v.clone();
        }
        self.miss_ctr.put("best_index");
        let v = compute();
        self.slot(collection).best_index.insert(query_hash, v.clone());
        v
    }

    pub fn op_regex(&mut self, collection: &str, query_hash: u64, compute: impl FnOnce() -> bool) -> bool {
        if let Some(&v) = self.slot(collection).op_regex.get(&query_hash) {
            self.hit_ctr.put("op_regex");
            return v;
        }
        self.miss_ctr.put("op_regex");
        let v = compute();
        self.slot(collection).op_regex.insert(query_hash, v);
        v
    }

    pub fn op_node_ids(&mut self, collection: &str, query_id: u64, compute: impl FnOnce() -> BTreeSet<usize>) -> BTreeSet<usize> {
        if let Some(v) = self.slot(collection).op_node_ids.get(&query_id) {
            self.hit_ctr.put("op_node_ids");
            return v.clone();
        }
        self.miss_ctr.put("op_node_ids");
        let v = compute();
        self.slot(collection).op_node_ids.insert(query_id, v.clone());
        v
    }

    pub fn collection_doc_ids(&mut self, collection: &str, query_id: u64, compute: impl FnOnce() -> Vec<u64>) -> Vec<u64> {
        if let Some(v) = self.slot(collection).collection_doc_ids.get(&query_id) {
            self.hit_ctr.put("collection_doc_ids");
            return v.clone();
        }
        self.miss_ctr.put("collection_doc_ids");
        let v = compute();
        self.slot(collection).collection_doc_ids.insert(query_id, v.clone());
        v
    }

    pub fn index_doc_ids(&mut self, collection: &str, query_id: u64, compute: impl FnOnce() -> Vec<u64>) -> Vec<u64> {
        if let Some(v) = self.slot(collection).index_doc_ids.get(&query_id) {
            self.hit_ctr.put("index_doc_ids");
            return v.clone();
        }
        self.miss_ctr.put("index_doc_ids");
        let v = compute();
        self.slot(collection).index_doc_ids.insert(query_id, v.clone());
        v
    }
}

#[cfg(test)]
mod cache_test {
    use super::*;

    #[test]
    fn invalidate_clears_only_that_collection() {
        let mut cache = QueryCache::new();
        cache.best_index("a", 1, || (None, false));
        cache.best_index("b", 1, || (None, false));
        cache.invalidate("a");
        let mut a_calls = 0;
        cache.best_index("a", 1, || {
            a_calls += 1;
            (None, false)
        });
        assert_eq!(a_calls, 1);
        let mut b_calls = 0;
        cache.best_index("b", 1, || {
            b_calls += 1;
            (None, false)
        });
        assert_eq!(b_calls, 0);
    }
}
