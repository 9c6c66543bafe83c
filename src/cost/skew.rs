//! Cluster load-imbalance over time-windowed workload segments (§4.F).

use super::cache::QueryCache;
use crate::design::Design;
use crate::estimator::NodeEstimator;
use crate::histogram::Histogram;
use crate::workload::Workload;

pub struct SkewCostComponent {
    skew_intervals: u32,
    num_nodes: usize,
}

impl SkewCostComponent {
    pub fn new(skew_intervals: u32, num_nodes: usize) -> Self {
        Self {
            skew_intervals: skew_intervals.max(1),
            num_nodes: num_nodes.max(1),
        }
    }

    pub fn get_cost(&mut self, design: &Design, workload: &Workload, estimator: &NodeEstimator, cache: &mut QueryCache) -> f64 {
        let (earliest, latest) = match (workload.earliest_start(), workload.latest_end()) {
            (Some(e), Some(l)) => (e, l),
            _ => return 0.0,
        };
        let total_span = (latest - earliest).num_nanoseconds().unwrap_or(0);
        if total_span <= 0 {
            return 0.0;
        }
        let interval_ns = (total_span as f64 / self.skew_intervals as f64).max(1.0);

        let mut per_interval_touches: Vec<Histogram<usize>> = (0..self.skew_intervals).map(|_| Histogram::new()).collect();
        let mut per_interval_op_count: Vec<u64> = vec![0; self.skew_intervals as usize];
        let mut per_interval_total_touches: Vec<u64> = vec![0; self.skew_intervals as usize];

        for session in &workload.sessions {
            let offset_ns = (session.start_time - earliest).num_nanoseconds().unwrap_or(0) as f64;
            let mut bucket = (offset_ns / interval_ns) as usize;
            if bucket >= self.skew_intervals as usize {
                bucket = self.skew_intervals as usize - 1;
            }
            for op in &session.operations {
                let touched = cache.op_node_ids(&op.collection, op.query_id, || estimator.estimate(design, op));
                for node in &touched {
                    per_interval_touches[bucket].put(*node);
                }
                per_interval_total_touches[bucket] += touched.len() as u64;
                per_interval_op_count[bucket] += 1;
            }
        }

        let best = 1.0 / self.num_nodes as f64;
        let mut weighted_sum = 0.0;
        let mut weight_total = 0u64;

        for i in 0..self.skew_intervals as usize {
            let total = per_interval_total_touches[i];
            if total == 0 {
                continue;
            }
            let mut log_sum = 0.0;
            for node in 0..self.num_nodes {
                let touch_count = per_interval_touches[i].get(&node);
                let mut p = touch_count as f64 / total as f64;
                if p < best {
                    p = best + (1.0 - p / best) * (1.0 - best);
                }
                log_sum += (p / best).ln();
            }
            let denom = self.num_nodes as f64 * (1.0 / best).ln();
            let skew = if denom.abs() > f64::EPSILON { (log_sum / denom).clamp(0.0, 1.0) } else { 0.0 };

            weighted_sum += skew * per_interval_op_count[i] as f64;
            weight_total += per_interval_op_count[i];
        }

        if weight_total == 0 {
            0.0
        } else {
            (weighted_sum / weight_total as f64).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod skew_test {
    use super::*;
    use crate::catalog::Catalog;
    use crate::workload::{OpType, Operation, PredicateType, Session};
    use std::collections::HashMap;

    fn session_with_broadcast_op(id: u64, t: chrono::DateTime<chrono::Utc>) -> Session {
        let op = Operation {
            query_id: id,
            query_hash: id,
            collection: "c".to_string(),
            op_type: OpType::Query,
            predicates: {
                let mut m = HashMap::new();
                m.insert("a".to_string(), PredicateType::Regex);
                m
            },
            query_content: vec![serde_json::json!({"a": "x"})],
            query_fields: vec![],
            query_time: t,
            resp_time: None,
            upsert: false,
            multi: false,
        };
        Session {
            session_id: id,
            start_time: t,
            end_time: t,
            operations: vec![op],
        }
    }

    #[test]
    fn broadcast_operations_are_perfectly_balanced() {
        let catalog = Catalog::new(vec![]);
        let t0 = chrono::Utc::now();
        let sessions = vec![session_with_broadcast_op(1, t0), session_with_broadcast_op(2, t0 + chrono::Duration::seconds(1))];
        let workload = Workload::new(sessions);
        let mut design = Design::new();
        design.add_collection("c");
        design.recover("c");
        design.add_shard_key("c", vec!["a".to_string()]).unwrap();
        let estimator = NodeEstimator::new(&catalog, HashMap::new(), 4);
        let mut cache = QueryCache::new();
        let mut skew = SkewCostComponent::new(1, 4);
        let cost = skew.get_cost(&design, &workload, &estimator, &mut cache);
        assert!(cost.abs() < 1e-9, "expected perfectly balanced skew, got {cost}");
    }

    #[test]
    fn empty_workload_has_zero_skew() {
        let catalog = Catalog::new(vec![]);
        let workload = Workload::default();
        let design = Design::new();
        let estimator = NodeEstimator::new(&catalog, HashMap::new(), 4);
        let mut cache = QueryCache::new();
        let mut skew = SkewCostComponent::new(4, 4);
        assert_eq!(skew.get_cost(&design, &workload, &estimator, &mut cache), 0.0);
    }
}
