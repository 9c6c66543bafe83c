//! Depth-first branch-and-bound search over per-collection
//! `(shardKey, denormParent, indexSet)` choices (§4.I).

mod candidates;
mod initial;
mod iterators;
mod parallel;

pub use candidates::{CollectionCandidates, DesignCandidates, MIN_SELECTIVITY};
pub use initial::InitialDesigner;
pub use iterators::{CompoundKeyIterator, SimpleKeyIterator, MAX_INDEX_SIZE, SHARD_KEY_MAX_COMPOUND_COUNT};
pub use parallel::{default_worker_count, run_parallel};

use crate::cost::CostModel;
use crate::design::Design;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Solved,
    TimedOut,
    UserTerminated,
}

/// The search's final report (§6 Output).
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub design: Design,
    pub cost: f64,
    pub nodes_explored: u64,
    pub backtracks: u64,
    pub leaves: u64,
    pub status: Status,
    pub duration: Duration,
    /// `(hits, misses)` across the cost model's per-collection
    /// memoization cache over the whole run (§9 supplement,
    /// `state.py::cache_hit_ctr`/`cache_miss_ctr`), surfaced as an
    /// optional diagnostics block.
    pub cache_diagnostics: (u64, u64),
}

struct SearchState {
    best_design: Design,
    best_cost: f64,
    nodes_explored: u64,
    backtracks: u64,
    leaves: u64,
    status: Status,
}

/// Owns the candidate domains and the cost model for one search run.
/// Not `Send`/shared: per §5, each outer worker owns its own `CostModel`
/// and LRU buffers; only the best (cost, design) pair is meant to be
/// shared across workers, which callers do themselves.
pub struct BBSearch {
    candidates: DesignCandidates,
    cost_model: CostModel,
    initial_design: Design,
    timeout: Duration,
    terminated: Option<Arc<AtomicBool>>,
    shared_best: Option<Arc<Mutex<(f64, Design)>>>,
    shuffle_seed: Option<u64>,
}

impl BBSearch {
    pub fn new(candidates: DesignCandidates, cost_model: CostModel, initial_design: Design, timeout: Duration) -> Self {
        Self {
            candidates,
            cost_model,
            initial_design,
            timeout,
            terminated: None,
            shared_best: None,
            shuffle_seed: None,
        }
    }

    /// Installs a cooperative cancellation flag checked after every
    /// backtrack (§5 "Cancellation").
    pub fn with_terminated_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.terminated = Some(flag);
        self
    }

    /// Installs the `(best_cost, best_design)` pair shared across outer
    /// workers (§5 "Shared resources"): any worker finding a strictly
    /// better design claims the lock and overwrites both fields; this
    /// worker starts from, and keeps contributing to, that shared bound
    /// instead of only its own local best.
    pub fn with_shared_best(mut self, shared: Arc<Mutex<(f64, Design)>>) -> Self {
        self.shared_best = Some(shared);
        self
    }

    /// Randomizes this worker's child enumeration order, deterministically
    /// derived from `seed`, so that distinct outer workers explore the
    /// search tree in distinct orders (§5 "distinct ... randomized choice
    /// orderings").
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn run(&mut self) -> SearchReport {
        let start = Instant::now();
        let initial_cost = self.cost_model.overall_cost(&self.initial_design);

        let mut order = self.candidates.order().to_vec();
        let mut root = Design::new();
        if let Some(seed) = self.shuffle_seed {
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }
        for name in &order {
            root.add_collection(name);
        }

        let (mut best_cost, mut best_design) = (initial_cost, self.initial_design.copy());
        if let Some(shared) = &self.shared_best {
            let guard = shared.lock();
            if guard.0 < best_cost {
                best_cost = guard.0;
                best_design = guard.1.copy();
            }
        }

        let mut state = SearchState {
            best_design,
            best_cost,
            nodes_explored: 0,
            backtracks: 0,
            leaves: 0,
            status: Status::Solved,
        };

        self.recurse(&root, 0, &order, start, &mut state);

        if let Some(shared) = &self.shared_best {
            let mut guard = shared.lock();
            if state.best_cost < guard.0 {
                guard.0 = state.best_cost;
                guard.1 = state.best_design.copy();
            } else if guard.0 < state.best_cost {
                state.best_cost = guard.0;
                state.best_design = guard.1.copy();
            }
        }

        SearchReport {
            design: state.best_design,
            cost: state.best_cost,
            nodes_explored: state.nodes_explored,
            backtracks: state.backtracks,
            leaves: state.leaves,
            status: state.status,
            duration: start.elapsed(),
            cache_diagnostics: self.cost_model.cache_diagnostics(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.terminated.as_ref().map(|f| f.load(Ordering::Relaxed)).unwrap_or(false)
    }

    fn recurse(&mut self, design: &Design, idx: usize, order: &[String], start: Instant, state: &mut SearchState) {
        if idx == order.len() {
            state.leaves += 1;
            let cost = self.cost_model.overall_cost(design);
            if cost < state.best_cost {
                state.best_cost = cost;
                state.best_design = design.copy();
                if let Some(shared) = &self.shared_best {
                    let mut guard = shared.lock();
                    if cost < guard.0 {
                        guard.0 = cost;
                        guard.1 = design.copy();
                    }
                }
            }
            return;
        }

        let name = order[idx].clone();
        let candidates = self.candidates.for_collection(&name);

        let mut denorm_iter = SimpleKeyIterator::new(candidates.denorm_parents);
        while let Some(denorm_choice) = denorm_iter.next() {
            let mut shard_iter = CompoundKeyIterator::new(candidates.shard_key_fields.clone(), SHARD_KEY_MAX_COMPOUND_COUNT);
            while let Some(shard_tuple) = shard_iter.next() {
                let mut index_iter = CompoundKeyIterator::new(candidates.index_fields.clone(), MAX_INDEX_SIZE);
                while let Some(index_tuple) = index_iter.next() {
                    if state.status != Status::Solved {
                        return;
                    }

                    let mut child = design.copy();
                    child.recover(&name);
                    if child.set_denormalization_parent(&name, denorm_choice.clone()).is_err() {
                        continue;
                    }
                    if !shard_tuple.is_empty() && child.add_shard_key(&name, shard_tuple.clone()).is_err() {
                        continue;
                    }
                    if !index_tuple.is_empty() && child.add_index(&name, index_tuple.clone()).is_err() {
                        continue;
                    }

                    // Feasibility filter (§4.I): acyclic denorm chain,
                    // shard-key/denorm mutual exclusion, non-empty
                    // parent names. Infeasible children are skipped
                    // silently, not raised as errors (§7).
                    if child.validate(self.cost_model.catalog()).is_err() {
                        continue;
                    }

                    state.nodes_explored += 1;
                    let cost = self.cost_model.overall_cost(&child);
                    if cost <= state.best_cost {
                        self.recurse(&child, idx + 1, order, start, state);
                    }

                    state.backtracks += 1;
                    if let Some(shared) = &self.shared_best {
                        if let Some(guard) = shared.try_lock() {
                            if guard.0 < state.best_cost {
                                state.best_cost = guard.0;
                                state.best_design = guard.1.copy();
                            }
                        }
                    }
                    if self.is_cancelled() {
                        state.status = Status::UserTerminated;
                        return;
                    }
                    if start.elapsed() >= self.timeout {
                        state.status = Status::TimedOut;
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod search_test {
    use super::*;
    use crate::catalog::{Catalog, Collection, Field, FieldType};
    use crate::config::CostConfig;
    use crate::cost::CostModel;
    use crate::workload::{OpType, Operation, PredicateType, Session, Workload};
    use std::collections::HashMap;

    fn config() -> CostConfig {
        CostConfig {
            env: "dev".to_string(),
            nodes: 4,
            max_memory: 1024,
            skew_intervals: 2,
            address_size: 64,
            window_size: 32,
            weight_network: 1.0,
            weight_disk: 1.0,
            weight_skew: 1.0,
            page_size: 4096,
            preload_enabled: false,
        }
    }

    fn catalog() -> Catalog {
        let mut fields = HashMap::new();
        fields.insert(
            "a".to_string(),
            Field {
                field_type: FieldType::Int,
                cardinality: 1000,
                selectivity: 0.9,
                avg_size: 8,
                ranges: vec![],
                fields: HashMap::new(),
                parent_col: None,
                parent_key: None,
                parent_conf: None,
            },
        );
        Catalog::new(vec![Collection {
            name: "c".to_string(),
            doc_count: 1000,
            avg_doc_size: 64,
            workload_percent: 1.0,
            fields,
            interesting: vec!["a".to_string()],
        }])
    }

    fn workload() -> Workload {
        let t = chrono::Utc::now();
        let mut predicates = HashMap::new();
        predicates.insert("a".to_string(), PredicateType::Equality);
        let op = Operation {
            query_id: 1,
            query_hash: 1,
            collection: "c".to_string(),
            op_type: OpType::Query,
            predicates,
            query_content: vec![serde_json::json!({"a": 7})],
            query_fields: vec![],
            query_time: t,
            resp_time: None,
            upsert: false,
            multi: false,
        };
        Workload::new(vec![Session { session_id: 1, start_time: t, end_time: t, operations: vec![op] }])
    }

    #[test]
    fn search_returns_a_complete_feasible_design_no_worse_than_initial() {
        let catalog = catalog();
        let wl = workload();
        let candidates = DesignCandidates::derive(&catalog);
        let initial = InitialDesigner::design(&catalog, &wl, config().nodes as usize);
        let cfg = config();
        let mut baseline_model = CostModel::new(catalog.clone(), wl.clone(), &cfg);
        let initial_cost = baseline_model.overall_cost(&initial);

        let model = CostModel::new(catalog.clone(), wl, &cfg);
        let mut search = BBSearch::new(candidates, model, initial, Duration::from_secs(2));
        let report = search.run();

        assert!(report.design.is_complete());
        assert!(report.design.validate(&catalog).is_ok());
        assert!(report.cost <= initial_cost + 1e-9);
        assert_eq!(report.status, Status::Solved);
        assert!(report.cache_diagnostics.0 + report.cache_diagnostics.1 > 0);
    }

    #[test]
    fn cancellation_flag_stops_the_search_early() {
        let catalog = catalog();
        let wl = workload();
        let candidates = DesignCandidates::derive(&catalog);
        let initial = InitialDesigner::design(&catalog, &wl, config().nodes as usize);
        let cfg = config();
        let model = CostModel::new(catalog, wl, &cfg);
        let flag = Arc::new(AtomicBool::new(true));
        let mut search = BBSearch::new(candidates, model, initial, Duration::from_secs(2)).with_terminated_flag(flag);
        let report = search.run();
        assert_eq!(report.status, Status::UserTerminated);
    }
}
