//! # Covisit
//!
//! Item-to-item similarity and user-to-item predictions over sparse binary
//! relations, backed entirely by a remote set/sorted-set store.
//!
//! An application declares one or more *recommender classes*. Each composes
//! named, weighted *matrices*: sparse bipartite relations between sets
//! (a user, a tag, a topic) and items (say, courses). From those relations
//! the engine maintains a per-item cache of weighted Jaccard similarities
//! and serves two query families:
//!
//! - **Similarity**: items most similar to a given item, best first,
//!   optionally capped to a per-item top-K row.
//! - **Prediction**: items ranked by aggregated similarity to everything in
//!   an input item set.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! mutation (add/remove/delete)
//!     ↓
//! [Recommender]        → dispatch by matrix label
//!     ↓
//! [Matrix]             → forward set + reverse index writes
//!     ↓
//! [SimilarityEngine]   → candidate discovery, weighted Jaccard,
//!     ↓                  atomic top-K row rebuild
//! similarity rows S(i)
//!     ↓
//! [Prediction query]   → store-side union over rows, exclusion, pagination
//! ```
//!
//! All mutable state lives in the store; a [`Recommender`] carries only
//! immutable configuration and is freely shared across threads. Mutations
//! either reprocess affected rows immediately or defer to an explicit
//! [`Recommender::process_items`] / [`Recommender::process_all`].
//!
//! ## Usage
//!
//! ```
//! use covisit::{MemoryStore, PredictionInput, Recommender, RecommenderConfig,
//!               Reprocess, SearchOptions};
//! use std::sync::Arc;
//!
//! # fn main() -> covisit::Result<()> {
//! let config = RecommenderConfig::new("courses")
//!     .matrix("users", 3.0)
//!     .matrix("tags", 2.0)
//!     .similarity_limit(0);
//! let rec = Recommender::new(Arc::new(MemoryStore::new()), config)?;
//!
//! rec.add_to_matrix("users", "u1", &["c1", "c2"], Reprocess::Immediate)?;
//! rec.add_to_matrix("tags", "t1", &["c1", "c3"], Reprocess::Immediate)?;
//!
//! let similar = rec.similarities_for("c1", &SearchOptions::new())?;
//! assert_eq!(similar, vec!["c2", "c3"]);
//!
//! let predicted = rec.predictions_for(
//!     &PredictionInput::items(["c2"]),
//!     &SearchOptions::new(),
//! )?;
//! assert_eq!(predicted, vec!["c1"]);
//! # Ok(())
//! # }
//! ```
//!
//! Against a live server, swap the store handle:
//!
//! ```rust,no_run
//! use covisit::{Recommender, RecommenderConfig, RedisStore};
//! use std::sync::Arc;
//!
//! # fn main() -> covisit::Result<()> {
//! let store = Arc::new(RedisStore::connect("redis://127.0.0.1:6379")?);
//! let rec = Recommender::new(store, RecommenderConfig::new("courses").matrix("users", 1.0))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `store` | Narrow store interface + redis / in-memory adapters |
//! | `matrix` | Forward/reverse bipartite relation per named matrix |
//! | `similarity` | Weighted Jaccard scoring and atomic row rebuild |
//! | `recommender` | Composition, mutation dispatch, maintenance |
//! | `prediction` | Store-side score aggregation, exclusion, pagination |
//! | `config` | Hierarchical configuration (TOML + environment) |

pub mod config; // Configuration system
pub mod error; // Error taxonomy
pub mod matrix; // Weighted bipartite relations
pub mod prediction; // Prediction query + shared query options
pub mod recommender; // Composition root
pub mod store; // Store interface and adapters

mod keys; // Keyspace layout
mod similarity; // Similarity engine

// Re-export public types
pub use config::{Config, EngineConfig, MatrixDef, RecommenderConfig, RecommenderDef,
                 StoreConfig, DEFAULT_SIMILARITY_LIMIT};
pub use error::{Error, Result};
pub use matrix::Matrix;
pub use prediction::{PredictionInput, ScoredItem, SearchOptions};
pub use recommender::{Recommender, Reprocess};
pub use store::{MemoryStore, RedisStore, Store, StoreError, StoreResult};
