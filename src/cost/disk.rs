//! Disk cost via LRU simulation plus an index-selection heuristic
//! (§4.E).

use super::cache::QueryCache;
use crate::buffer::LRUBuffer;
use crate::catalog::{Catalog, Scalar};
use crate::design::Design;
use crate::estimator::hashing::stable_hash_parts;
use crate::estimator::NodeEstimator;
use crate::workload::{OpType, Operation, Workload};
use std::collections::HashMap;

pub struct DiskCostComponent {
    buffers: Vec<LRUBuffer>,
    window_size: u64,
    preload_enabled: bool,
}

impl DiskCostComponent {
    pub fn new(max_nodes: usize, window_size: u64, preload_enabled: bool) -> Self {
        Self {
            buffers: (0..max_nodes.max(1)).map(|_| LRUBuffer::new(window_size)).collect(),
            window_size,
            preload_enabled,
        }
    }

    /// Resets every node's buffer and re-runs optional preload. The
    /// LRU state is per-evaluation, not carried across designs (§5).
    pub fn get_cost(&mut self, design: &Design, catalog: &Catalog, workload: &Workload, estimator: &NodeEstimator, cache: &mut QueryCache) -> f64 {
        for buf in &mut self.buffers {
            buf.reset();
        }
        if self.preload_enabled {
            self.preload(design, catalog);
        }

        let children = children_map(design);
        let mut total_hits: u64 = 0;
        let mut total_worst: u64 = 0;
        let synthetic = vec![serde_json::Value::Null];

        for session in &workload.sessions {
            for op in &session.operations {
                let col_name = op.collection.as_str();
                if !design.has_collection(col_name) || design.is_relaxed(col_name) || design.is_denormalized(col_name) {
                    continue;
                }
                let collection = match catalog.get(col_name) {
                    Some(c) => c,
                    None => continue,
                };
                let fullscan = collection.fullscan_pages();
                let slot_size = subtree_ratio(col_name, &children, catalog).ceil().max(1.0) as u64;
                let indexes = design.get_indexes(col_name);
                let (chosen_index, covering) = cache.best_index(col_name, op.query_hash, || guess_index(&indexes, op));
                let node_ids = cache.op_node_ids(col_name, op.query_id, || estimator.estimate(design, op));
                let is_regex = cache.op_regex(col_name, op.query_hash, || op.is_regex());
                let docs: &[serde_json::Value] = if op.query_content.is_empty() { &synthetic } else { &op.query_content };

                match (&chosen_index, is_regex) {
                    (Some(idx), false) => {
                        let doc_ids = cache.index_doc_ids(col_name, op.query_id, || index_doc_ids(idx, docs));
                        for &node in &node_ids {
                            let buf = &mut self.buffers[node];
                            for &doc_id in &doc_ids {
                                let misses = buf.get_document_from_index(col_name, idx, doc_id, slot_size);
                                total_hits += misses;
                                total_worst += if op.op_type == OpType::Insert { misses } else { fullscan };
                            }
                        }
                    }
                    (None, _) => {
                        let touched = node_ids.len() as u64;
                        total_hits += fullscan * touched;
                        total_worst += fullscan * touched;
                    }
                    (Some(_), true) => {
                        if covering {
                            total_worst += fullscan * node_ids.len() as u64;
                        } else {
                            let doc_ids = cache.collection_doc_ids(col_name, op.query_id, || collection_doc_ids(docs));
                            for &node in &node_ids {
                                let buf = &mut self.buffers[node];
                                for &doc_id in &doc_ids {
                                    let misses = buf.get_document_from_collection(col_name, doc_id, slot_size);
                                    total_hits += misses;
                                    total_worst += fullscan;
                                }
                            }
                        }
                    }
                }
            }
        }

        if total_worst > 0 {
            (total_hits as f64 / total_worst as f64).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn preload(&mut self, design: &Design, catalog: &Catalog) {
        for collection in catalog.iter() {
            let name = collection.name.as_str();
            if !design.has_collection(name) || design.is_relaxed(name) || design.is_denormalized(name) {
                continue;
            }
            let count = ((collection.workload_percent * self.window_size as f64).floor().max(0.0) as u64).min(self.window_size);
            if count == 0 {
                continue;
            }
            for buf in &mut self.buffers {
                let mut rng = crate::shared::rand::seeded_rng(name);
                buf.preload(name, count, &mut rng);
            }
        }
    }
}

/// `parent -> direct denormalized children`, derived from the current
/// design.
fn children_map(design: &Design) -> HashMap<String, Vec<String>> {
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for name in design.collections() {
        if let Some(parent) = design.get_denormalization_parent(name) {
            children.entry(parent).or_default().push(name.to_string());
        }
    }
    children
}

/// The per-field embedding ratio (average `parent_conf` across a
/// collection's fields that declare one), falling back to a modest
/// fixed inflation when the catalog doesn't carry an explicit value.
fn embedding_ratio(catalog: &Catalog, collection: &str) -> f64 {
    if let Some(col) = catalog.get(collection) {
        let ratios: Vec<f64> = col.fields.values().filter_map(|f| f.parent_conf).collect();
        if !ratios.is_empty() {
            return ratios.iter().sum::<f64>() / ratios.len() as f64;
        }
    }
    1.2
}

/// Product of embedding ratios along every denormalization chain
/// folded into `name` (§4.E): a parent absorbs its direct children's
/// ratio, and transitively its grandchildren's, since those are never
/// queried directly once embedded.
fn subtree_ratio(name: &str, children: &HashMap<String, Vec<String>>, catalog: &Catalog) -> f64 {
    match children.get(name) {
        None => 1.0,
        Some(kids) => kids.iter().map(|k| embedding_ratio(catalog, k) * subtree_ratio(k, children, catalog)).product(),
    }
}

/// Picks the Design index whose prefix best matches the operation's
/// referenced fields, tie-breaking on longer index length. A field
/// used in a REGEX predicate never counts as matched (§4.E). Covering
/// requires strict prefix containment of every referenced field within
/// the chosen index's leading keys (per the Design Notes' resolution
/// of the "covering index" open question).
pub fn guess_index(indexes: &[Vec<String>], op: &Operation) -> (Option<Vec<String>>, bool) {
    let referenced = op.referenced_fields();
    let matchable: Vec<&str> = referenced
        .iter()
        .copied()
        .filter(|f| !matches!(op.predicates.get(*f), Some(crate::workload::PredicateType::Regex)))
        .collect();

    let mut best: Option<&Vec<String>> = None;
    let mut best_score = 0usize;
    for idx in indexes {
        let mut score = 0usize;
        for key in idx {
            if matchable.contains(&key.as_str()) {
                score += 1;
            } else {
                break;
            }
        }
        if score == 0 {
            continue;
        }
        let better = score > best_score || (score == best_score && best.map(|b| b.len()).unwrap_or(0) < idx.len());
        if better {
            best = Some(idx);
            best_score = score;
        }
    }

    let chosen = best.cloned();
    let covering = match &chosen {
        Some(idx) if op.op_type == OpType::Query && !referenced.is_empty() => {
            let prefix: std::collections::HashSet<&str> = idx.iter().take(referenced.len()).map(|s| s.as_str()).collect();
            idx.len() >= referenced.len() && referenced.iter().all(|f| prefix.contains(f))
        }
        _ => false,
    };
    (chosen, covering)
}

fn index_doc_ids(idx: &[String], docs: &[serde_json::Value]) -> Vec<u64> {
    docs.iter()
        .map(|doc| {
            let bytes: Vec<Vec<u8>> = idx
                .iter()
                .filter_map(|f| doc.get(f).and_then(Scalar::from_json))
                .map(|s| s.stable_bytes())
                .collect();
            stable_hash_parts(bytes.iter().map(|b| b.as_slice()))
        })
        .collect()
}

fn collection_doc_ids(docs: &[serde_json::Value]) -> Vec<u64> {
    docs.iter()
        .map(|doc| {
            let values = Operation::all_scalar_values(doc);
            let bytes: Vec<Vec<u8>> = values.iter().map(|v| v.stable_bytes()).collect();
            stable_hash_parts(bytes.iter().map(|b| b.as_slice()))
        })
        .collect()
}
