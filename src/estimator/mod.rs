//! NodeEstimator: maps an operation to the set of node IDs it touches
//! (§4.C). Construction carries the per-collection node count (possibly
//! reduced from `max_nodes` by the cost model, §9 supplement) and a
//! reference to the read-only catalog.

pub mod hashing;

use crate::catalog::{Catalog, Field, Scalar};
use crate::design::Design;
use crate::workload::{Operation, OpType, PredicateType};
use std::collections::BTreeSet;
use std::collections::HashMap;

/// Stand-in for an EXPLAIN-style estimate of how many nodes a query
/// against a field of the given `selectivity` would touch, were that
/// field the shard key (§9 supplement, `nodeestimator.py::guessNodes`).
/// Used by `InitialDesigner`'s scoring rather than the per-operation
/// estimation path above: a highly selective field (low `selectivity`)
/// implies few nodes touched per query.
pub fn guess_nodes(selectivity: f64, max_nodes: usize) -> usize {
    let n = max_nodes.max(1) as f64;
    ((selectivity.clamp(0.0, 1.0)) * n).round().clamp(1.0, n) as usize
}

/// Estimates the node IDs touched by an operation under a given design.
///
/// Holds one effective node count per collection, since the cost model
/// may shrink a collection's simulated node count below `max_nodes`
/// based on its shard key's cardinality (§9 supplement).
pub struct NodeEstimator<'a> {
    catalog: &'a Catalog,
    node_counts: HashMap<String, usize>,
    max_nodes: usize,
}

impl<'a> NodeEstimator<'a> {
    pub fn new(catalog: &'a Catalog, node_counts: HashMap<String, usize>, max_nodes: usize) -> Self {
        Self {
            catalog,
            node_counts,
            max_nodes,
        }
    }

    fn nodes_for(&self, collection: &str) -> usize {
        self.node_counts
            .get(collection)
            .copied()
            .unwrap_or(self.max_nodes)
            .max(1)
    }

    /// Estimates the set of node IDs `op` touches under `design`.
    pub fn estimate(&self, design: &Design, op: &Operation) -> BTreeSet<usize> {
        let n = self.nodes_for(&op.collection);
        let shard_keys = design.get_shard_keys(&op.collection);

        if shard_keys.is_empty() {
            return BTreeSet::from([0]);
        }

        if op.op_type == OpType::Insert {
            return self.hash_from_content(&op.collection, &shard_keys, op, n);
        }

        let all_equality = shard_keys
            .iter()
            .all(|f| op.predicates.get(f) == Some(&PredicateType::Equality));
        if all_equality {
            return self.hash_from_content(&op.collection, &shard_keys, op, n);
        }

        // Either an uncoverable predicate type (RANGE/REGEX) on a
        // shard-key field, or a shard-key field not referenced at all:
        // both broadcast (§4.C step 3).
        Self::broadcast(n)
    }

    fn broadcast(n: usize) -> BTreeSet<usize> {
        (0..n).collect()
    }

    /// Hashes the shard-key values extracted from each content document
    /// into a node ID, unioning the results (usually size 1 per doc).
    /// Falls back to broadcasting a document that doesn't carry all
    /// shard-key fields (can't compute its node deterministically).
    fn hash_from_content(&self, collection: &str, shard_keys: &[String], op: &Operation, n: usize) -> BTreeSet<usize> {
        let docs = op.field_values(shard_keys);
        let col = match self.catalog.get(collection) {
            Some(c) => c,
            None => return Self::broadcast(n),
        };
        let field_defs: Vec<&Field> = shard_keys.iter().filter_map(|f| col.field(f)).collect();
        if field_defs.len() != shard_keys.len() {
            return Self::broadcast(n);
        }

        let mut nodes = BTreeSet::new();
        for values in docs {
            if values.len() != shard_keys.len() {
                // document doesn't carry every shard-key field: can't
                // place it deterministically, so it could land anywhere.
                return Self::broadcast(n);
            }
            nodes.insert(Self::combined_node(&values, &field_defs, n));
        }
        if nodes.is_empty() {
            nodes.insert(0);
        }
        nodes
    }

    /// Mixed-radix combination of per-field range buckets (§4.C):
    /// `floor(sum(bucket_i * N^i) / N^(k-1))`. Reduces to the bucket
    /// itself for a single-field shard key.
    fn combined_node(values: &[Scalar], field_defs: &[&Field], n: usize) -> usize {
        let k = values.len();
        if k == 0 {
            return 0;
        }
        let n128 = n as u128;
        let mut sum: u128 = 0;
        for (i, value) in values.iter().enumerate() {
            let bucket = field_defs[i].range_bucket(value, n) as u128;
            sum += bucket.saturating_mul(n128.pow(i as u32));
        }
        let denom = n128.pow((k as u32).saturating_sub(1)).max(1);
        (sum / denom) as usize
    }
}
