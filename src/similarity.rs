//! Similarity engine: per-item recomputation of weighted Jaccard rows.
//!
//! For a focal item `i`, candidates are every item sharing at least one set
//! with `i` in at least one matrix. Each matrix M contributes a Jaccard
//! coefficient over reverse sets,
//!
//! ```text
//! J_M(i, j) = |Rev_M(i) ∩ Rev_M(j)| / |Rev_M(i) ∪ Rev_M(j)|
//! ```
//!
//! and the total score normalizes the weighted sum over every configured
//! matrix, so scores stay in [0, 1]:
//!
//! ```text
//! σ(i, j) = Σ_M w_M · J_M(i, j) / Σ_M w_M
//! ```
//!
//! A rebuild costs four store round-trips regardless of candidate count:
//! one pipelined fetch of the focal reverse sets, one union for candidate
//! discovery, one pipelined fetch of all candidate reverse sets, and one
//! atomic row overwrite. Rebuilding S(i) never touches S(j); callers that
//! want mutual rows process both endpoints.

use crate::error::Result;
use crate::keys::Keyspace;
use crate::matrix::Matrix;
use crate::store::Store;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Borrowed view over one recommender's matrices and row cap
pub(crate) struct SimilarityEngine<'a, S> {
    store: &'a S,
    matrices: &'a [Matrix<S>],
    keys: &'a Keyspace,
    limit: usize,
}

impl<'a, S: Store> SimilarityEngine<'a, S> {
    pub fn new(store: &'a S, matrices: &'a [Matrix<S>], keys: &'a Keyspace, limit: usize) -> Self {
        Self {
            store,
            matrices,
            keys,
            limit,
        }
    }

    /// Focal reverse sets (one per matrix, pipelined) and the deduplicated
    /// candidate list discovered through them
    fn neighborhood(&self, item: &str) -> Result<(Vec<Vec<String>>, Vec<String>)> {
        let reverse_keys: Vec<String> = self
            .matrices
            .iter()
            .map(|m| m.reverse_key(item))
            .collect();
        let reverse_sets = self.store.smembers_many(&reverse_keys)?;

        let mut forward_keys = Vec::new();
        for (matrix, sets) in self.matrices.iter().zip(&reverse_sets) {
            for set_id in sets {
                forward_keys.push(matrix.forward_key(set_id));
            }
        }
        if forward_keys.is_empty() {
            return Ok((reverse_sets, Vec::new()));
        }

        let mut union = self.store.sunion(&forward_keys)?;
        union.remove(item);
        let mut candidates: Vec<String> = union.into_iter().collect();
        candidates.sort_unstable();
        Ok((reverse_sets, candidates))
    }

    /// C(i): every item co-occurring with `item` in any set of any matrix
    pub fn candidates(&self, item: &str) -> Result<Vec<String>> {
        let (_, candidates) = self.neighborhood(item)?;
        Ok(candidates)
    }

    /// Rebuild S(item) from current matrix contents. Returns the number of
    /// positive-score entries written (before the top-K trim).
    pub fn process_item(&self, item: &str) -> Result<usize> {
        let (reverse_sets, candidates) = self.neighborhood(item)?;
        let row_key = self.keys.similarity(item);
        if candidates.is_empty() {
            self.store.replace_row(&row_key, &[], self.limit)?;
            return Ok(0);
        }

        // Reverse sets of every candidate, for every matrix, in one batch
        let mut fetch_keys = Vec::with_capacity(self.matrices.len() * candidates.len());
        for matrix in self.matrices {
            for candidate in &candidates {
                fetch_keys.push(matrix.reverse_key(candidate));
            }
        }
        let candidate_sets = self.store.smembers_many(&fetch_keys)?;

        let focal_sets: Vec<HashSet<&str>> = reverse_sets
            .iter()
            .map(|sets| sets.iter().map(String::as_str).collect())
            .collect();
        let total_weight: f64 = self.matrices.iter().map(Matrix::weight).sum();
        let stride = candidates.len();

        let entries: Vec<(String, f64)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(col, candidate)| {
                let mut weighted = 0.0;
                for (row, matrix) in self.matrices.iter().enumerate() {
                    let candidate_set = &candidate_sets[row * stride + col];
                    let focal = &focal_sets[row];
                    let intersection = candidate_set
                        .iter()
                        .filter(|s| focal.contains(s.as_str()))
                        .count();
                    let union = focal.len() + candidate_set.len() - intersection;
                    if union > 0 {
                        weighted += matrix.weight() * intersection as f64 / union as f64;
                    }
                }
                let score = weighted / total_weight;
                (score > 0.0).then(|| (candidate.clone(), score))
            })
            .collect();

        let written = entries.len();
        self.store.replace_row(&row_key, &entries, self.limit)?;
        debug!(item, candidates = stride, written, "rebuilt similarity row");
        Ok(written)
    }

    /// Process every distinct item once on the given worker pool. Returns
    /// the number of items processed.
    pub fn process_many(&self, items: &[String], pool: &rayon::ThreadPool) -> Result<usize> {
        let distinct: BTreeSet<&str> = items
            .iter()
            .map(String::as_str)
            .filter(|item| !item.is_empty())
            .collect();
        let focal: Vec<&str> = distinct.into_iter().collect();
        pool.install(|| {
            focal
                .par_iter()
                .try_for_each(|item| self.process_item(item).map(|_| ()))
        })?;
        Ok(focal.len())
    }
}
