//! Recommender: a configured composition of weighted matrices sharing one
//! keyspace prefix.
//!
//! All mutations enter here. Each call dispatches to the named matrix,
//! then either reprocesses the affected items immediately
//! ([`Reprocess::Immediate`]) or leaves rows stale until an explicit
//! [`Recommender::process_items`] / [`Recommender::process_all`]
//! ([`Reprocess::Deferred`]). Reads never mutate.
//!
//! The recommender holds no mutable in-process state: matrices, weights,
//! the row cap, and the keyspace prefix are fixed at construction, so one
//! instance is safe to share across threads, bounded only by the store's
//! own guarantees.

use crate::config::RecommenderConfig;
use crate::error::{check_item, Error, Result};
use crate::keys::Keyspace;
use crate::matrix::Matrix;
use crate::prediction::{self, PredictionInput, ScoredItem, SearchOptions};
use crate::similarity::SimilarityEngine;
use crate::store::{RedisStore, Store};
use crate::Config;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Whether a mutation reprocesses affected similarity rows before returning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reprocess {
    /// Rebuild every affected row as part of the call
    Immediate,
    /// Leave rows stale; the caller reprocesses later
    Deferred,
}

/// A configured recommender class over a shared store handle
pub struct Recommender<S> {
    name: String,
    keys: Keyspace,
    store: Arc<S>,
    matrices: Vec<Matrix<S>>,
    similarity_limit: usize,
    pool: rayon::ThreadPool,
}

impl<S: Store> Recommender<S> {
    /// Validate `config` and bind it to `store`. Fails before any store
    /// I/O on an empty matrix list, duplicate labels, or invalid weights.
    pub fn new(store: Arc<S>, config: RecommenderConfig) -> Result<Self> {
        if config.name.is_empty() {
            return Err(Error::Other("recommender name must not be empty".into()));
        }
        if config.matrices.is_empty() {
            return Err(Error::NoMatrices(config.name));
        }
        let mut seen = HashSet::new();
        for def in &config.matrices {
            if def.label.is_empty() {
                return Err(Error::Other("matrix label must not be empty".into()));
            }
            if !seen.insert(def.label.clone()) {
                return Err(Error::DuplicateMatrix(def.label.clone()));
            }
            if !(def.weight.is_finite() && def.weight > 0.0) {
                return Err(Error::InvalidWeight {
                    label: def.label.clone(),
                    weight: def.weight,
                });
            }
        }

        let keys = Keyspace::new(&config.name);
        let matrices = config
            .matrices
            .iter()
            .map(|def| Matrix::new(&def.label, def.weight, keys.clone(), Arc::clone(&store)))
            .collect();
        let threads = if config.reprocess_threads == 0 {
            num_cpus::get()
        } else {
            config.reprocess_threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            name: config.name,
            keys,
            store,
            matrices,
            similarity_limit: config.similarity_limit,
            pool,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-item similarity row cap (0 = unbounded)
    pub fn similarity_limit(&self) -> usize {
        self.similarity_limit
    }

    /// Look up a matrix by label, failing loudly on unknown labels
    pub fn matrix(&self, label: &str) -> Result<&Matrix<S>> {
        self.matrices
            .iter()
            .find(|m| m.label() == label)
            .ok_or_else(|| Error::UnknownMatrix(label.to_string()))
    }

    fn engine(&self) -> SimilarityEngine<'_, S> {
        SimilarityEngine::new(
            self.store.as_ref(),
            &self.matrices,
            &self.keys,
            self.similarity_limit,
        )
    }

    /// Items whose rows a mutation through (matrix, set_id) can change:
    /// the mutated items plus the set's current members
    fn touched_focal(
        &self,
        matrix: &Matrix<S>,
        set_id: &str,
        items: &[&str],
    ) -> Result<Vec<String>> {
        let mut focal: BTreeSet<String> = self
            .store
            .smembers(&matrix.forward_key(set_id))?
            .into_iter()
            .collect();
        focal.extend(items.iter().map(|i| (*i).to_string()));
        Ok(focal.into_iter().collect())
    }

    /// Insert items into a set of the named matrix
    pub fn add_to_matrix(
        &self,
        label: &str,
        set_id: &str,
        items: &[&str],
        mode: Reprocess,
    ) -> Result<()> {
        let matrix = self.matrix(label)?;
        matrix.add(set_id, items)?;
        if mode == Reprocess::Immediate {
            let focal = self.touched_focal(matrix, set_id, items)?;
            self.engine().process_many(&focal, &self.pool)?;
        }
        Ok(())
    }

    /// Remove items from a set of the named matrix
    pub fn remove_from_matrix(
        &self,
        label: &str,
        set_id: &str,
        items: &[&str],
        mode: Reprocess,
    ) -> Result<()> {
        let matrix = self.matrix(label)?;
        matrix.remove(set_id, items)?;
        if mode == Reprocess::Immediate {
            let focal = self.touched_focal(matrix, set_id, items)?;
            self.engine().process_many(&focal, &self.pool)?;
        }
        Ok(())
    }

    /// Remove `item` from every set of the named matrix and reprocess it
    /// together with its former co-occurrents (across all matrices, since
    /// scores are cross-matrix)
    pub fn delete_from_matrix(&self, label: &str, item: &str) -> Result<()> {
        check_item(item)?;
        let matrix = self.matrix(label)?;
        let mut affected = self.engine().candidates(item)?;
        matrix.delete_item(item)?;
        affected.push(item.to_string());
        self.engine().process_many(&affected, &self.pool)?;
        Ok(())
    }

    /// Remove `item` everywhere: every matrix, the bookkeeping set, its
    /// similarity row, and its entry in former co-occurrents' rows; then
    /// reprocess those co-occurrents
    pub fn delete_item(&self, item: &str) -> Result<()> {
        check_item(item)?;
        let affected = self.engine().candidates(item)?;
        for matrix in &self.matrices {
            matrix.delete_item(item)?;
        }
        // Purge eagerly so no row shows the item even if a reprocess below
        // fails partway
        let member = [item.to_string()];
        for other in &affected {
            self.store.zrem(&self.keys.similarity(other), &member)?;
        }
        self.store.del(&[self.keys.similarity(item)])?;
        self.store.srem(&self.keys.all_items(), &member)?;
        self.engine().process_many(&affected, &self.pool)?;
        debug!(item, co_occurrents = affected.len(), "deleted item");
        Ok(())
    }

    /// Rebuild the similarity rows of the given items
    pub fn process_items(&self, items: &[&str]) -> Result<usize> {
        for item in items {
            check_item(item)?;
        }
        let owned: Vec<String> = items.iter().map(|i| (*i).to_string()).collect();
        self.engine().process_many(&owned, &self.pool)
    }

    /// Rebuild every similarity row. Enumerates items from the bookkeeping
    /// set when present, else by scanning every forward set. Returns the
    /// number of items processed.
    pub fn process_all(&self) -> Result<usize> {
        let mut items: Vec<String> = self.store.smembers(&self.keys.all_items())?;
        if items.is_empty() {
            let mut forward_keys = Vec::new();
            for matrix in &self.matrices {
                forward_keys.extend(
                    self.store
                        .keys_matching(&self.keys.forward_wildcard(matrix.label()))?,
                );
            }
            items = self.store.sunion(&forward_keys)?.into_iter().collect();
        }
        let processed = self.engine().process_many(&items, &self.pool)?;
        debug!(processed, "full reprocess");
        Ok(processed)
    }

    /// Items most similar to `item`, best first
    pub fn similarities_for(&self, item: &str, options: &SearchOptions) -> Result<Vec<String>> {
        Ok(self
            .similarities_with_scores(item, options)?
            .into_iter()
            .map(|scored| scored.item)
            .collect())
    }

    /// Items most similar to `item` with their scores, best first
    pub fn similarities_with_scores(
        &self,
        item: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ScoredItem>> {
        check_item(item)?;
        let rows = self
            .store
            .zrange_with_scores(&self.keys.similarity(item), 0, -1, true)?;
        let mut exclude: HashSet<String> = options.exclude.iter().cloned().collect();
        exclude.insert(item.to_string());
        Ok(prediction::rank(rows, &exclude, options))
    }

    /// Cached score between two items, if `other` is in S(item)
    pub fn similarity_between(&self, item: &str, other: &str) -> Result<Option<f64>> {
        check_item(item)?;
        check_item(other)?;
        Ok(self.store.zscore(&self.keys.similarity(item), other)?)
    }

    /// |S(item)|
    pub fn similarity_count(&self, item: &str) -> Result<usize> {
        check_item(item)?;
        Ok(self.store.zcard(&self.keys.similarity(item))?)
    }

    /// Number of items known to the recommender
    pub fn item_count(&self) -> Result<usize> {
        Ok(self.store.scard(&self.keys.all_items())?)
    }

    /// Predicted items for `input`, best first
    pub fn predictions_for(
        &self,
        input: &PredictionInput,
        options: &SearchOptions,
    ) -> Result<Vec<String>> {
        Ok(self
            .predictions_with_scores(input, options)?
            .into_iter()
            .map(|scored| scored.item)
            .collect())
    }

    /// Predicted items for `input` with aggregated scores, best first.
    /// Input items never appear in the output.
    pub fn predictions_with_scores(
        &self,
        input: &PredictionInput,
        options: &SearchOptions,
    ) -> Result<Vec<ScoredItem>> {
        let input_items = self.resolve_input(input)?;
        if input_items.is_empty() {
            return Ok(Vec::new());
        }
        let mut exclude: HashSet<String> = options.exclude.iter().cloned().collect();
        exclude.extend(input_items.iter().cloned());
        prediction::aggregate(
            self.store.as_ref(),
            &self.keys,
            &input_items,
            &exclude,
            options,
        )
    }

    fn resolve_input(&self, input: &PredictionInput) -> Result<Vec<String>> {
        match input {
            PredictionInput::Items(items) => {
                for item in items {
                    check_item(item)?;
                }
                let distinct: BTreeSet<String> = items.iter().cloned().collect();
                Ok(distinct.into_iter().collect())
            }
            PredictionInput::MatrixSet { label, set_id } => {
                self.matrix(label)?.members_of_set(set_id)
            }
        }
    }

    /// Delete every key under the recommender's prefix. The authoritative
    /// recovery step after external inconsistency.
    pub fn clean(&self) -> Result<()> {
        let keys = self.store.keys_matching(&self.keys.wildcard())?;
        let deleted = if keys.is_empty() {
            0
        } else {
            self.store.del(&keys)?
        };
        debug!(deleted, "cleaned keyspace");
        Ok(())
    }
}

impl Recommender<RedisStore> {
    /// Convenience constructor: connect to the store declared by the
    /// ambient configuration (covisit.toml / COVISIT_* environment)
    pub fn connect(config: RecommenderConfig) -> Result<Self> {
        let ambient = Config::load()?;
        let store = RedisStore::from_config(&ambient)?;
        Self::new(Arc::new(store), config)
    }
}
