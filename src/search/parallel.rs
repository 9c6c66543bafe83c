//! Optional outer-parallel search (§5 "Optional outer parallelism"):
//! multiple BB searches run concurrently with randomized choice
//! orderings, sharing only the current `best_cost`/`best_design` pair
//! through a lock-protected monotone update. The cost model and LRU
//! buffers stay per-worker.

use super::{BBSearch, DesignCandidates, SearchReport, Status};
use crate::cost::CostModel;
use crate::design::Design;
use crate::estimator::hashing::stable_hash;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default worker count for outer-parallel search: one worker per
/// logical CPU, the same sizing the teacher uses for its own worker
/// pools.
pub fn default_worker_count() -> usize {
    num_cpus::get()
}

/// Runs `workers` independent `BBSearch` instances on their own thread,
/// seeded with distinct shuffle orders, sharing a single best-pair
/// `Mutex` (§5). `make_cost_model` is called once per worker so each
/// gets its own `CostModel` (and hence its own LRU buffers) rather than
/// sharing one.
pub fn run_parallel(
    candidates: DesignCandidates,
    make_cost_model: impl Fn() -> CostModel + Send + Sync + 'static,
    initial_design: Design,
    timeout: Duration,
    workers: usize,
    terminated: Option<Arc<AtomicBool>>,
) -> SearchReport {
    let workers = workers.max(1);
    if workers == 1 {
        let mut search = BBSearch::new(candidates, make_cost_model(), initial_design, timeout);
        if let Some(flag) = terminated {
            search = search.with_terminated_flag(flag);
        }
        return search.run();
    }

    let start = std::time::Instant::now();
    let shared_best: Arc<Mutex<(f64, Design)>> = Arc::new(Mutex::new((f64::INFINITY, initial_design.copy())));
    let nodes_explored = Arc::new(AtomicU64::new(0));
    let backtracks = Arc::new(AtomicU64::new(0));
    let leaves = Arc::new(AtomicU64::new(0));
    let cache_hits = Arc::new(AtomicU64::new(0));
    let cache_misses = Arc::new(AtomicU64::new(0));
    let worst_status = Arc::new(Mutex::new(Status::Solved));

    thread::scope(|scope| {
        for worker_idx in 0..workers {
            let candidates = candidates.clone();
            let cost_model = make_cost_model();
            let initial_design = initial_design.copy();
            let shared_best = Arc::clone(&shared_best);
            let terminated = terminated.clone();
            let nodes_explored = Arc::clone(&nodes_explored);
            let backtracks = Arc::clone(&backtracks);
            let leaves = Arc::clone(&leaves);
            let cache_hits = Arc::clone(&cache_hits);
            let cache_misses = Arc::clone(&cache_misses);
            let worst_status = Arc::clone(&worst_status);

            // Deterministic per-worker shuffle seed: each worker explores
            // a distinct child order, but the whole run stays
            // reproducible for a fixed (candidates, workers) pair.
            let seed = stable_hash(format!("outer-worker-{worker_idx}").as_bytes());

            scope.spawn(move || {
                let mut search = BBSearch::new(candidates, cost_model, initial_design, timeout)
                    .with_shared_best(shared_best)
                    .with_shuffle_seed(seed);
                if let Some(flag) = terminated {
                    search = search.with_terminated_flag(flag);
                }
                let report = search.run();
                nodes_explored.fetch_add(report.nodes_explored, Ordering::Relaxed);
                backtracks.fetch_add(report.backtracks, Ordering::Relaxed);
                leaves.fetch_add(report.leaves, Ordering::Relaxed);
                cache_hits.fetch_add(report.cache_diagnostics.0, Ordering::Relaxed);
                cache_misses.fetch_add(report.cache_diagnostics.1, Ordering::Relaxed);
                if report.status != Status::Solved {
                    *worst_status.lock() = report.status;
                }
            });
        }
    });

    let (best_cost, best_design) = {
        let guard = shared_best.lock();
        (guard.0, guard.1.copy())
    };

    SearchReport {
        design: best_design,
        cost: best_cost,
        nodes_explored: nodes_explored.load(Ordering::Relaxed),
        backtracks: backtracks.load(Ordering::Relaxed),
        leaves: leaves.load(Ordering::Relaxed),
        status: *worst_status.lock(),
        duration: start.elapsed(),
        cache_diagnostics: (cache_hits.load(Ordering::Relaxed), cache_misses.load(Ordering::Relaxed)),
    }
}

#[cfg(test)]
mod parallel_test {
    use super::*;
    use crate::catalog::{Catalog, Collection, Field, FieldType};
    use crate::config::CostConfig;
    use crate::search::InitialDesigner;
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
    fn parallel_search_matches_or_beats_a_single_worker() {
        let catalog = catalog();
        let wl = workload();
        let candidates = DesignCandidates::derive(&catalog);
        let cfg = config();
        let initial = InitialDesigner::design(&catalog, &wl, cfg.nodes as usize);

        let mut solo = BBSearch::new(
            candidates.clone(),
            CostModel::new(catalog.clone(), wl.clone(), &cfg),
            initial.copy(),
            Duration::from_secs(2),
        );
        let solo_report = solo.run();

        let cfg_for_workers = cfg.clone();
        let catalog_for_workers = catalog.clone();
        let wl_for_workers = wl.clone();
        let report = run_parallel(
            candidates,
            move || CostModel::new(catalog_for_workers.clone(), wl_for_workers.clone(), &cfg_for_workers),
            initial,
            Duration::from_secs(2),
            3,
            None,
        );

        assert!(report.design.is_complete());
        assert!(report.design.validate(&catalog).is_ok());
        assert!(report.cost <= solo_report.cost + 1e-9);
        assert_eq!(report.status, Status::Solved);
    }
}
