//! Finite, restartable choice iterators consumed by the branch-and-bound
//! search (§4.I). Each materializes its full sequence once at
//! construction, so the search can back up by resetting a cursor rather
//! than recomputing (§9 "Iterators").

use std::collections::HashSet;

/// Maximum shard-key tuple size the search will ever try.
pub const SHARD_KEY_MAX_COMPOUND_COUNT: usize = 3;
/// Maximum index-key tuple size the search will ever try.
pub const MAX_INDEX_SIZE: usize = 3;

/// Yields `None` first, then each candidate denormalization parent
/// name, exactly once.
pub struct SimpleKeyIterator {
    values: Vec<Option<String>>,
    cursor: usize,
}

impl SimpleKeyIterator {
    pub fn new(candidates: Vec<String>) -> Self {
        let mut values = vec![None];
        values.extend(candidates.into_iter().map(Some));
        Self { values, cursor: 0 }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl Iterator for SimpleKeyIterator {
    type Item = Option<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.values.get(self.cursor).cloned();
        if item.is_some() {
            self.cursor += 1;
        }
        item
    }
}

/// Yields the empty tuple first, then every permutation of the
/// candidate fields from size 1 up to `max_size`, each tuple exactly
/// once.
///
/// The original's "redundant-prefix pruning" is simplified here to
/// plain exact-tuple deduplication via a precomputed set: permutations
/// of distinct candidates never repeat a tuple on their own, so the
/// dedup set only guards against a caller passing a degenerate
/// candidate list (documented in DESIGN.md).
pub struct CompoundKeyIterator {
    tuples: Vec<Vec<String>>,
    cursor: usize,
}

impl CompoundKeyIterator {
    pub fn new(candidates: Vec<String>, max_size: usize) -> Self {
        let mut tuples = vec![Vec::new()];
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        seen.insert(Vec::new());
        let cap = max_size.min(candidates.len());
        let mut used = vec![false; candidates.len()];
        let mut current = Vec::new();
        for size in 1..=cap {
            Self::permute(&candidates, size, &mut current, &mut used, &mut tuples, &mut seen);
        }
        Self { tuples, cursor: 0 }
    }

    fn permute(
        candidates: &[String],
        size: usize,
        current: &mut Vec<String>,
        used: &mut [bool],
        out: &mut Vec<Vec<String>>,
        seen: &mut HashSet<Vec<String>>,
    ) {
        if current.len() == size {
            if seen.insert(current.clone()) {
                out.push(current.clone());
            }
            return;
        }
        for i in 0..candidates.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            current.push(candidates[i].clone());
            Self::permute(candidates, size, current, used, out, seen);
            current.pop();
            used[i] = false;
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }
}

impl Iterator for CompoundKeyIterator {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.tuples.get(self.cursor).cloned();
        if item.is_some() {
            self.cursor += 1;
        }
        item
    }
}
