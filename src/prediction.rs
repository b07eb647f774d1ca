//! Query types and the prediction aggregation path.
//!
//! Predictions sum cached similarity scores across the input items'
//! rows. The sum executes store-side as a sorted-set union into a
//! transient scratch key, so one round-trip aggregates arbitrarily many
//! rows; missing rows contribute zero. Exclusion filtering happens before
//! pagination, and output ordering is descending score with ties broken
//! by item id ascending.

use crate::error::Result;
use crate::keys::Keyspace;
use crate::store::Store;
use std::collections::HashSet;

/// What to predict from: an explicit item set, or one matrix set resolved
/// at call time
#[derive(Debug, Clone)]
pub enum PredictionInput {
    /// Items the subject already has
    Items(Vec<String>),
    /// Use F_{label}(set_id) as the input item set
    MatrixSet { label: String, set_id: String },
}

impl PredictionInput {
    /// Input from an explicit list of items
    pub fn items<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        PredictionInput::Items(items.into_iter().map(Into::into).collect())
    }

    /// Input resolved from one matrix set at call time
    pub fn matrix_set(label: &str, set_id: &str) -> Self {
        PredictionInput::MatrixSet {
            label: label.to_string(),
            set_id: set_id.to_string(),
        }
    }
}

/// Pagination and exclusion options shared by similarity and prediction
/// reads. Defaults: offset 0, unbounded, no exclusions.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub offset: usize,
    pub limit: Option<usize>,
    pub exclude: Vec<String>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the first `offset` results (applied after exclusion)
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Return at most `limit` results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Never return these items
    pub fn exclude<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.exclude.extend(items.into_iter().map(Into::into));
        self
    }
}

/// One ranked result
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub item: String,
    pub score: f64,
}

/// Filter, order, and paginate scored rows: exclusion first, then
/// descending score with ties by item id ascending, then offset/limit
pub(crate) fn rank(
    mut rows: Vec<(String, f64)>,
    exclude: &HashSet<String>,
    options: &SearchOptions,
) -> Vec<ScoredItem> {
    rows.retain(|(item, _)| !exclude.contains(item));
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows.into_iter()
        .skip(options.offset)
        .take(options.limit.unwrap_or(usize::MAX))
        .map(|(item, score)| ScoredItem { item, score })
        .collect()
}

/// Aggregate cached similarity rows for `input_items` into ranked
/// predictions
pub(crate) fn aggregate<S: Store>(
    store: &S,
    keys: &Keyspace,
    input_items: &[String],
    exclude: &HashSet<String>,
    options: &SearchOptions,
) -> Result<Vec<ScoredItem>> {
    let row_keys: Vec<String> = input_items.iter().map(|i| keys.similarity(i)).collect();
    let scratch = keys.scratch();
    store.zunion_store(&scratch, &row_keys)?;
    let rows = store.zrange_with_scores(&scratch, 0, -1, true);
    // Scratch keys are transient; a failed delete is swept up by `clean`
    let _ = store.del(&[scratch]);
    Ok(rank(rows?, exclude, options))
}
