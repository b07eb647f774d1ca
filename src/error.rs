//! Crate Error Types

use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by recommenders and their queries
#[derive(Error, Debug)]
pub enum Error {
    /// Recommender configured without any matrix
    #[error("recommender '{0}' has no matrices configured")]
    NoMatrices(String),

    /// Two matrices share a label within one recommender
    #[error("duplicate matrix label '{0}'")]
    DuplicateMatrix(String),

    /// Matrix weight is zero, negative, or not finite
    #[error("matrix '{label}' has invalid weight {weight}")]
    InvalidWeight { label: String, weight: f64 },

    /// A matrix label was referenced that the recommender does not define
    #[error("unknown matrix label '{0}'")]
    UnknownMatrix(String),

    /// Recommender name not present in the loaded configuration
    #[error("recommender '{0}' not found in configuration")]
    UnknownRecommender(String),

    /// Empty item identifier
    #[error("empty item identifier")]
    EmptyItem,

    /// Empty set identifier
    #[error("empty set identifier")]
    EmptySet,

    /// Configuration file / environment extraction error
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Error from the backing store, propagated unchanged
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type for recommender operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reject empty item identifiers before any store I/O
pub(crate) fn check_item(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::EmptyItem);
    }
    Ok(())
}

/// Reject empty set identifiers before any store I/O
pub(crate) fn check_set(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::EmptySet);
    }
    Ok(())
}
