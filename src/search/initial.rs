//! Picks a single, workload-weighted shard key per collection with no
//! indexes and no denormalization. Always produces a complete, feasible
//! design usable as the search's initial upper bound (§4.J).

use crate::catalog::Catalog;
use crate::design::Design;
use crate::estimator::guess_nodes;
use crate::workload::{OpType, PredicateType, Workload};
use std::collections::HashMap;

pub const MIN_SELECTIVITY: f64 = 0.1;
pub const MIN_CARDINALITY: u64 = 2;

pub struct InitialDesigner;

impl InitialDesigner {
    /// For every collection, picks the `interesting` field most often
    /// used in an EQUALITY predicate against that collection in the
    /// workload, among fields meeting the cardinality/selectivity
    /// floor, weighted down by `guess_nodes` (§9 supplement) so that a
    /// field spreading queries across fewer nodes wins ties over one
    /// that would broadcast more. A collection with no eligible field
    /// gets an empty shard key, which is a valid (if probably costly)
    /// choice.
    pub fn design(catalog: &Catalog, workload: &Workload, max_nodes: usize) -> Design {
        let mut scores: HashMap<(String, String), u64> = HashMap::new();
        for session in &workload.sessions {
            for op in &session.operations {
                if op.op_type != OpType::Query {
                    continue;
                }
                for (field, predicate) in &op.predicates {
                    if *predicate == PredicateType::Equality {
                        *scores.entry((op.collection.clone(), field.clone())).or_insert(0) += 1;
                    }
                }
            }
        }

        let mut names: Vec<&str> = catalog.names().collect();
        names.sort();

        let mut design = Design::new();
        for name in names {
            design.add_collection(name);
            design.recover(name);
            let collection = match catalog.get(name) {
                Some(c) => c,
                None => continue,
            };

            let mut best: Option<(String, f64)> = None;
            for field_name in &collection.interesting {
                let field = match collection.field(field_name) {
                    Some(f) => f,
                    None => continue,
                };
                if field.selectivity < MIN_SELECTIVITY || field.cardinality < MIN_CARDINALITY {
                    continue;
                }
                let frequency = scores.get(&(name.to_string(), field_name.clone())).copied().unwrap_or(0) as f64;
                let nodes_touched = guess_nodes(field.selectivity, max_nodes) as f64;
                let score = frequency / nodes_touched;
                let replace = match &best {
                    Some((_, best_score)) => score > *best_score,
                    None => true,
                };
                if replace {
                    best = Some((field_name.clone(), score));
                }
            }

            if let Some((field, _)) = best {
                let _ = design.add_shard_key(name, vec![field]);
            }
        }
        design
    }
}
