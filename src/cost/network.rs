//! Cross-node traffic per operation, denormalization-aware (§4.G).

use super::cache::QueryCache;
use crate::design::Design;
use crate::estimator::NodeEstimator;
use crate::workload::{OpType, Workload};

pub struct NetworkCostComponent {
    num_nodes: usize,
}

impl NetworkCostComponent {
    pub fn new(num_nodes: usize) -> Self {
        Self { num_nodes: num_nodes.max(1) }
    }

    pub fn get_cost(&mut self, design: &Design, workload: &Workload, estimator: &NodeEstimator, cache: &mut QueryCache) -> f64 {
        let mut sum: u64 = 0;
        // Total count of in-design operations, merged or not — the
        // denominator's query_count (§4.G "sum / (query_count * N)").
        // A merged op still counts here; it just contributes 0 to `sum`.
        let mut total: u64 = 0;

        for session in &workload.sessions {
            let mut prev_query_collection: Option<&str> = None;
            for op in &session.operations {
                if !design.has_collection(&op.collection) {
                    continue;
                }
                total += 1;
                let merged = design
                    .get_denormalization_parent(&op.collection)
                    .map(|parent| Some(parent.as_str()) == prev_query_collection)
                    .unwrap_or(false);

                if !merged {
                    let touched = cache.op_node_ids(&op.collection, op.query_id, || estimator.estimate(design, op));
                    sum += touched.len() as u64;
                }

                if op.op_type == OpType::Query {
                    prev_query_collection = Some(op.collection.as_str());
                }
            }
        }

        if total == 0 {
            0.0
        } else {
            (sum as f64 / (total as f64 * self.num_nodes as f64)).clamp(0.0, 1.0)
        }
    }
}
