//! Orchestrates one end-to-end advisor run: catalog + workload + cost
//! config in, a scored `Design` out.

use crate::catalog::Catalog;
use crate::config::CostConfig;
use crate::cost::CostModel;
use crate::search::{run_parallel, BBSearch, DesignCandidates, InitialDesigner, SearchReport};
use crate::workload::Workload;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Runs the full pipeline once: initial design, then branch-and-bound
/// search, returning the search's report.
pub struct App {
    catalog: Catalog,
    workload: Workload,
    config: CostConfig,
    timeout: Duration,
    workers: usize,
}

impl App {
    pub fn new(catalog: Catalog, workload: Workload, config: CostConfig, timeout: Duration) -> Self {
        Self {
            catalog,
            workload,
            config,
            timeout,
            workers: 1,
        }
    }

    /// Sets the number of outer-parallel search workers (§5). `1` (the
    /// default) runs a single synchronous search with no thread pool.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Builds the initial design and candidate domains, then runs the
    /// search to completion (or until timeout/cancellation).
    pub fn run(&self, terminated: Option<Arc<AtomicBool>>) -> SearchReport {
        info!(
            component = "app",
            event = "started",
            collections = self.catalog.len(),
            operations = self.workload.operation_count(),
            workers = self.workers,
            "advisor run starting"
        );

        let initial = InitialDesigner::design(&self.catalog, &self.workload, self.config.nodes as usize);
        let candidates = DesignCandidates::derive(&self.catalog);

        let report = if self.workers <= 1 {
            let model = CostModel::new(self.catalog.clone(), self.workload.clone(), &self.config);
            let mut search = BBSearch::new(candidates, model, initial, self.timeout);
            if let Some(flag) = terminated {
                search = search.with_terminated_flag(flag);
            }
            search.run()
        } else {
            let catalog = self.catalog.clone();
            let workload = self.workload.clone();
            let config = self.config.clone();
            run_parallel(
                candidates,
                move || CostModel::new(catalog.clone(), workload.clone(), &config),
                initial,
                self.timeout,
                self.workers,
                terminated,
            )
        };

        info!(
            component = "app",
            event = "finished",
            cost = report.cost,
            nodes_explored = report.nodes_explored,
            backtracks = report.backtracks,
            leaves = report.leaves,
            status = ?report.status,
            duration_ms = report.duration.as_millis() as u64,
            "advisor run finished"
        );

        report
    }
}

#[cfg(test)]
mod app_test {
    use super::*;
    use crate::catalog::{Collection, Field, FieldType};
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
            doc_count: 100,
            avg_doc_size: 64,
            workload_percent: 1.0,
            fields,
            interesting: vec!["a".to_string()],
        }])
    }

    #[test]
    fn multiple_workers_produce_a_complete_feasible_design() {
        let advisor = App::new(catalog(), Workload::default(), config(), Duration::from_secs(2)).with_workers(3);
        let report = advisor.run(None);
        assert!(report.design.is_complete());
        assert!(report.design.validate(&catalog()).is_ok());
    }

    #[test]
    fn zero_workers_is_treated_as_one() {
        let advisor = App::new(catalog(), Workload::default(), config(), Duration::from_secs(2)).with_workers(0);
        let report = advisor.run(None);
        assert!(report.design.is_complete());
    }
}
