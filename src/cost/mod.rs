//! The weighted composition of disk/skew/network cost, plus the
//! shared per-collection memoization cache (§4.H).

mod cache;
mod disk;
mod network;
mod skew;

pub use cache::QueryCache;
pub use disk::{guess_index, DiskCostComponent};
pub use network::NetworkCostComponent;
pub use skew::SkewCostComponent;

use crate::catalog::Catalog;
use crate::config::CostConfig;
use crate::design::Design;
use crate::estimator::NodeEstimator;
use crate::workload::Workload;
use std::collections::HashMap;

/// Per-collection shard-key fields, used only to shrink the simulated
/// node count for a collection whose shard key can't actually spread
/// across every node (§9 supplement, `state.py::calcNumNodes`).
fn effective_node_count(design: &Design, catalog: &Catalog, collection: &str, max_nodes: usize) -> usize {
    let shard_keys = design.get_shard_keys(collection);
    if shard_keys.is_empty() || max_nodes <= 1 {
        return max_nodes.max(1);
    }
    let col = match catalog.get(collection) {
        Some(c) => c,
        None => return max_nodes,
    };
    let cardinality_product: u128 = shard_keys
        .iter()
        .filter_map(|f| col.field(f))
        .map(|f| f.cardinality.max(1) as u128)
        .product();
    if cardinality_product >= max_nodes as u128 {
        return max_nodes;
    }
    let ratio = max_nodes as f64 / (cardinality_product.max(1) as f64);
    if ratio < 2.0 {
        return max_nodes;
    }
    let shrink = ratio.log2().ceil() as u32;
    let reduced = max_nodes >> shrink;
    reduced.max(1)
}

/// Holds the catalog, workload, weights, and the per-collection
/// memoization cache. `overall_cost` is pure over (design, catalog,
/// workload): same inputs always produce the same cost (§8).
pub struct CostModel {
    catalog: Catalog,
    workload: Workload,
    max_nodes: usize,
    weight_disk: f64,
    weight_skew: f64,
    weight_network: f64,
    disk: DiskCostComponent,
    skew: SkewCostComponent,
    network: NetworkCostComponent,
    cache: QueryCache,
    last_design: Option<Design>,
}

impl CostModel {
    pub fn new(catalog: Catalog, workload: Workload, config: &CostConfig) -> Self {
        let max_nodes = config.nodes as usize;
        Self {
            catalog,
            workload,
            max_nodes,
            weight_disk: config.weight_disk,
            weight_skew: config.weight_skew,
            weight_network: config.weight_network,
            disk: DiskCostComponent::new(max_nodes, config.window_size as u64, config.preload_enabled),
            skew: SkewCostComponent::new(config.skew_intervals, max_nodes),
            network: NetworkCostComponent::new(max_nodes),
            cache: QueryCache::new(),
            last_design: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache_diagnostics(&self) -> (u64, u64) {
        (self.cache.hit_ctr.get_sample_count(), self.cache.miss_ctr.get_sample_count())
    }

    /// Computes the weighted cost of `design`, invalidating only the
    /// per-collection caches for collections whose record changed
    /// since the last call (§4.H).
    pub fn overall_cost(&mut self, design: &Design) -> f64 {
        match &self.last_design {
            Some(prev) => {
                for col in prev.get_delta(design) {
                    self.cache.invalidate(&col);
                }
            }
            None => {
                for name in design.collections() {
                    self.cache.invalidate(name);
                }
            }
        }

        let node_counts: HashMap<String, usize> = design
            .collections()
            .map(|name| (name.to_string(), effective_node_count(design, &self.catalog, name, self.max_nodes)))
            .collect();
        let estimator = NodeEstimator::new(&self.catalog, node_counts, self.max_nodes);

        let weight_sum = self.weight_disk + self.weight_skew + self.weight_network;
        if weight_sum <= 0.0 {
            self.last_design = Some(design.copy());
            return 0.0;
        }

        let mut total = 0.0;
        if self.weight_disk > 0.0 {
            total += self.weight_disk * self.disk.get_cost(design, &self.catalog, &self.workload, &estimator, &mut self.cache);
        }
        if self.weight_skew > 0.0 {
            total += self.weight_skew * self.skew.get_cost(design, &self.workload, &estimator, &mut self.cache);
        }
        if self.weight_network > 0.0 {
            total += self.weight_network * self.network.get_cost(design, &self.workload, &estimator, &mut self.cache);
        }

        self.last_design = Some(design.copy());
        (total / weight_sum).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod cost_model_test {
    use super::*;
    use crate::catalog::Collection;

    fn config() -> CostConfig {
        CostConfig {
            env: "dev".to_string(),
            nodes: 4,
            max_memory: 1024,
            skew_intervals: 4,
            address_size: 64,
            window_size: 64,
            weight_network: 1.0,
            weight_disk: 1.0,
            weight_skew: 1.0,
            page_size: 4096,
            preload_enabled: false,
        }
    }

    #[test]
    fn empty_design_and_workload_cost_zero() {
        let catalog = Catalog::new(vec![]);
        let workload = Workload::default();
        let mut model = CostModel::new(catalog, workload, &config());
        let design = Design::new();
        assert_eq!(model.overall_cost(&design), 0.0);
    }

    #[test]
    fn cost_is_deterministic_across_repeated_calls() {
        let catalog = Catalog::new(vec![Collection {
            name: "c".to_string(),
            doc_count: 10,
            avg_doc_size: 64,
            workload_percent: 1.0,
            fields: Default::default(),
            interesting: vec![],
        }]);
        let workload = Workload::default();
        let mut model = CostModel::new(catalog, workload, &config());
        let mut design = Design::new();
        design.add_collection("c");
        design.recover("c");
        let first = model.overall_cost(&design);
        let second = model.overall_cost(&design);
        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first));
    }

    #[test]
    fn zero_weight_skips_that_component_entirely() {
        let catalog = Catalog::new(vec![]);
        let workload = Workload::default();
        let mut cfg = config();
        cfg.weight_disk = 0.0;
        cfg.weight_skew = 0.0;
        let mut model = CostModel::new(catalog, workload, &cfg);
        let design = Design::new();
        assert_eq!(model.overall_cost(&design), 0.0);
    }
}
