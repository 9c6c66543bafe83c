//! The mutable Design object: per-collection shard key, index set, and
//! denormalization parent, with well-formedness invariants (§3, §4.B).

use crate::error::{AdvisorError, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// The per-collection choice record. A collection not yet assigned a
/// choice is `Relaxed` rather than `Concrete` with empty fields — the
/// two are deliberately distinct states (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
enum CollectionState {
    Relaxed,
    Concrete(CollectionRecord),
}

/// Shard key, index set, and denormalization parent for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CollectionRecord {
    pub indexes: Vec<Vec<String>>,
    pub shard_keys: Vec<String>,
    pub denorm: Option<String>,
}

/// A candidate physical design: a choice of shard key, index set, and
/// denormalization parent per collection.
#[derive(Debug, Clone, Default)]
pub struct Design {
    // Preserves insertion order so iteration (and search enumeration
    // order, §5) is deterministic.
    order: Vec<String>,
    data: HashMap<String, CollectionState>,
}

impl Design {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection(&mut self, name: &str) {
        if !self.data.contains_key(name) {
            self.order.push(name.to_string());
            self.data.insert(name.to_string(), CollectionState::Relaxed);
        }
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn remove_collection(&mut self, name: &str) -> Result<()> {
        if self.data.remove(name).is_none() {
            return Err(AdvisorError::UnknownCollection(name.to_string()));
        }
        self.order.retain(|c| c != name);
        Ok(())
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    fn record_mut(&mut self, name: &str) -> Result<&mut CollectionRecord> {
        match self.data.get_mut(name) {
            Some(CollectionState::Concrete(r)) => Ok(r),
            Some(CollectionState::Relaxed) => {
                self.data.insert(name.to_string(), CollectionState::Concrete(CollectionRecord::default()));
                match self.data.get_mut(name) {
                    Some(CollectionState::Concrete(r)) => Ok(r),
                    _ => unreachable!(),
                }
            }
            None => Err(AdvisorError::UnknownCollection(name.to_string())),
        }
    }

    fn record(&self, name: &str) -> Result<Option<&CollectionRecord>> {
        match self.data.get(name) {
            Some(CollectionState::Concrete(r)) => Ok(Some(r)),
            Some(CollectionState::Relaxed) => Ok(None),
            None => Err(AdvisorError::UnknownCollection(name.to_string())),
        }
    }

    /// Adds an index. Tuples are ordered; duplicate tuples are
    /// rejected (silently ignored, matching the original `addIndex`).
    pub fn add_index(&mut self, name: &str, key_tuple: Vec<String>) -> Result<()> {
        if key_tuple.is_empty() {
            return Err(AdvisorError::InvariantViolation(format!(
                "index key tuple for '{name}' must be non-empty"
            )));
        }
        let record = self.record_mut(name)?;
        if !record.indexes.contains(&key_tuple) {
            record.indexes.push(key_tuple);
        }
        Ok(())
    }

    /// Replaces any existing shard key with `tuple`.
    pub fn add_shard_key(&mut self, name: &str, tuple: Vec<String>) -> Result<()> {
        self.record_mut(name)?.shard_keys = tuple;
        Ok(())
    }

    pub fn set_denormalization_parent(&mut self, name: &str, parent: Option<String>) -> Result<()> {
        self.record_mut(name)?.denorm = parent;
        Ok(())
    }

    pub fn get_denormalization_parent(&self, name: &str) -> Option<String> {
        match self.record(name) {
            Ok(Some(r)) => r.denorm.clone().filter(|p| p != name),
            _ => None,
        }
    }

    /// Root-ward chain of denormalization parents, nearest ancestor
    /// first removed... actually ordered root-first (matches the
    /// original's `getDenormalizationHierarchy`, which inserts each
    /// newly discovered parent at position 0).
    pub fn get_denormalization_hierarchy(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = name.to_string();
        // bounded by collection count to tolerate a caller-introduced cycle
        for _ in 0..self.order.len() {
            match self.get_denormalization_parent(&current) {
                Some(parent) => {
                    chain.insert(0, parent.clone());
                    current = parent;
                }
                None => break,
            }
        }
        chain
    }

    pub fn is_denormalized(&self, name: &str) -> bool {
        self.get_denormalization_parent(name).is_some()
    }

    pub fn in_shard_key_pattern(&self, name: &str, field: &str) -> bool {
        match self.record(name) {
            Ok(Some(r)) => r.shard_keys.iter().any(|k| k == field),
            _ => false,
        }
    }

    pub fn get_shard_keys(&self, name: &str) -> Vec<String> {
        match self.record(name) {
            Ok(Some(r)) => r.shard_keys.clone(),
            _ => Vec::new(),
        }
    }

    pub fn get_indexes(&self, name: &str) -> Vec<Vec<String>> {
        match self.record(name) {
            Ok(Some(r)) => r.indexes.clone(),
            _ => Vec::new(),
        }
    }

    /// Structural clone.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// The output shape from §6: per collection, its index tuples,
    /// shard-key tuple, and denorm parent. Collections still relaxed
    /// (never assigned a choice) are reported with an empty record.
    pub fn to_output(&self) -> HashMap<String, CollectionRecord> {
        self.order
            .iter()
            .map(|name| (name.clone(), self.record(name).ok().flatten().cloned().unwrap_or_default()))
            .collect()
    }

    /// Set of collection names whose record differs between `self`
    /// and `other` (used to invalidate only the affected per-collection
    /// caches in the cost model).
    pub fn get_delta(&self, other: &Design) -> HashSet<String> {
        let mut delta = HashSet::new();
        let mut names: HashSet<&str> = self.data.keys().map(|s| s.as_str()).collect();
        names.extend(other.data.keys().map(|s| s.as_str()));
        for name in names {
            if self.data.get(name) != other.data.get(name) {
                delta.insert(name.to_string());
            }
        }
        delta
    }

    pub fn is_relaxed(&self, name: &str) -> bool {
        matches!(self.data.get(name), Some(CollectionState::Relaxed))
    }

    /// Transitions a relaxed collection to concrete-but-empty. No-op
    /// if the collection is already concrete or unknown.
    pub fn recover(&mut self, name: &str) {
        if let Some(state @ CollectionState::Relaxed) = self.data.get_mut(name) {
            *state = CollectionState::Concrete(CollectionRecord::default());
        }
    }

    pub fn is_complete(&self) -> bool {
        self.data.values().all(|s| !matches!(s, CollectionState::Relaxed))
    }

    /// Validates the well-formedness invariants from §3 against a
    /// catalog. Called by the cost model / search before trusting a
    /// design, not enforced eagerly by mutation methods above (shard
    /// key/denorm mutual exclusion is the search's feasibility check,
    /// per §4.B).
    pub fn validate(&self, catalog: &crate::catalog::Catalog) -> Result<()> {
        for name in &self.order {
            let record = match self.record(name)? {
                Some(r) => r,
                None => continue,
            };
            let collection = catalog
                .get(name)
                .ok_or_else(|| AdvisorError::UnknownCollection(name.clone()))?;
            for key in record.shard_keys.iter().chain(record.indexes.iter().flatten()) {
                if !collection.has_field(key) {
                    return Err(AdvisorError::UnknownField {
                        collection: name.clone(),
                        field: key.clone(),
                    });
                }
            }
            let mut seen = HashSet::new();
            for idx in &record.indexes {
                if idx.is_empty() {
                    return Err(AdvisorError::InvariantViolation(format!(
                        "empty index tuple on '{name}'"
                    )));
                }
                if !seen.insert(idx.clone()) {
                    return Err(AdvisorError::InvariantViolation(format!(
                        "duplicate index tuple on '{name}'"
                    )));
                }
            }
            if self.has_denorm_cycle(name) {
                return Err(AdvisorError::InvariantViolation(format!(
                    "denormalization cycle involving '{name}'"
                )));
            }
            if let Some(parent) = &record.denorm {
                if parent.is_empty() {
                    return Err(AdvisorError::InvariantViolation(format!(
                        "empty denormalization parent on '{name}'"
                    )));
                }
                if !record.shard_keys.is_empty() && self.ancestor_has_shard_key(parent) {
                    return Err(AdvisorError::InvariantViolation(format!(
                        "'{name}' has both a shard key and a denormalized ancestor with a shard key"
                    )));
                }
            }
        }
        Ok(())
    }

    fn has_denorm_cycle(&self, start: &str) -> bool {
        let mut seen = HashSet::new();
        seen.insert(start.to_string());
        let mut current = start.to_string();
        for _ in 0..self.order.len() + 1 {
            match self.get_denormalization_parent(&current) {
                Some(parent) => {
                    if !seen.insert(parent.clone()) {
                        return true;
                    }
                    current = parent;
                }
                None => return false,
            }
        }
        true
    }

    fn ancestor_has_shard_key(&self, start: &str) -> bool {
        let mut current = Some(start.to_string());
        for _ in 0..self.order.len() + 1 {
            let name = match current {
                Some(n) => n,
                None => return false,
            };
            if !self.get_shard_keys(&name).is_empty() {
                return true;
            }
            current = self.get_denormalization_parent(&name);
        }
        false
    }
}

#[cfg(test)]
mod design_test {
    use super::*;

    #[test]
    fn new_collection_starts_relaxed() {
        let mut d = Design::new();
        d.add_collection("c");
        assert!(d.is_relaxed("c"));
        assert!(!d.is_complete());
    }

    #[test]
    fn recover_then_complete() {
        let mut d = Design::new();
        d.add_collection("c");
        d.recover("c");
        assert!(!d.is_relaxed("c"));
        assert!(d.is_complete());
    }

    #[test]
    fn add_index_rejects_duplicates_and_empty() {
        let mut d = Design::new();
        d.add_collection("c");
        d.add_index("c", vec!["a".to_string()]).unwrap();
        d.add_index("c", vec!["a".to_string()]).unwrap();
        assert_eq!(d.get_indexes("c").len(), 1);
        assert!(d.add_index("c", vec![]).is_err());
    }

    #[test]
    fn unknown_collection_is_a_lookup_error() {
        let mut d = Design::new();
        assert!(matches!(
            d.add_shard_key("nope", vec!["x".to_string()]),
            Err(AdvisorError::UnknownCollection(_))
        ));
    }

    #[test]
    fn denormalization_hierarchy_is_root_first() {
        let mut d = Design::new();
        for c in ["a", "b", "c"] {
            d.add_collection(c);
            d.recover(c);
        }
        d.set_denormalization_parent("c", Some("b".to_string())).unwrap();
        d.set_denormalization_parent("b", Some("a".to_string())).unwrap();
        assert_eq!(d.get_denormalization_hierarchy("c"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn get_delta_reports_changed_collections_only() {
        let mut a = Design::new();
        a.add_collection("x");
        a.add_collection("y");
        a.recover("x");
        a.recover("y");
        let mut b = a.clone();
        b.add_shard_key("x", vec!["f".to_string()]).unwrap();
        let delta = a.get_delta(&b);
        assert_eq!(delta, HashSet::from(["x".to_string()]));
    }

    #[test]
    fn validate_catches_cycles_and_shard_key_conflicts() {
        let catalog = crate::catalog::Catalog::new(vec![
            crate::catalog::Collection {
                name: "p".to_string(),
                doc_count: 1,
                avg_doc_size: 1,
                workload_percent: 0.5,
                fields: HashMap::new(),
                interesting: vec![],
            },
            crate::catalog::Collection {
                name: "c".to_string(),
                doc_count: 1,
                avg_doc_size: 1,
                workload_percent: 0.5,
                fields: HashMap::new(),
                interesting: vec![],
            },
        ]);
        let mut d = Design::new();
        d.add_collection("p");
        d.add_collection("c");
        d.recover("p");
        d.recover("c");
        d.set_denormalization_parent("c", Some("p".to_string())).unwrap();
        d.add_shard_key("c", vec![]).unwrap();
        d.add_shard_key("p", vec![]).unwrap();
        assert!(d.validate(&catalog).is_ok());

        d.set_denormalization_parent("p", Some("c".to_string())).unwrap();
        assert!(d.validate(&catalog).is_err());
    }
}
