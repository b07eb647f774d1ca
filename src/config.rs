//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - covisit.toml (default configuration)
//! - covisit.local.toml (git-ignored local overrides)
//! - Environment variables (COVISIT_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # covisit.toml
//! [store]
//! url = "redis://127.0.0.1:6379/0"
//! timeout_ms = 500
//!
//! [engine]
//! similarity_limit = 128
//! reprocess_threads = 0
//!
//! [recommenders.courses]
//! similarity_limit = 64
//! matrices = [
//!     { label = "users", weight = 3.0 },
//!     { label = "tags", weight = 2.0 },
//! ]
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! COVISIT_STORE__URL=redis://cache.internal:6379
//! COVISIT_ENGINE__SIMILARITY_LIMIT=256
//! ```

use crate::error::{Error, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Similarity rows keep this many entries unless configured otherwise
pub const DEFAULT_SIMILARITY_LIMIT: usize = 128;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Recommender classes an application declares up front, by name
    #[serde(default)]
    pub recommenders: HashMap<String, RecommenderDef>,
}

/// Backing store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store URL
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Per-request read/write timeout in milliseconds (0 = none)
    #[serde(default)]
    pub timeout_ms: u64,
}

/// Engine-wide defaults, overridable per recommender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-item similarity row cap (0 = unbounded)
    #[serde(default = "default_similarity_limit")]
    pub similarity_limit: usize,

    /// Worker threads for bulk reprocessing (0 = all CPUs)
    #[serde(default)]
    pub reprocess_threads: usize,
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_similarity_limit() -> usize {
    DEFAULT_SIMILARITY_LIMIT
}

/// One recommender class as declared in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderDef {
    pub matrices: Vec<MatrixDef>,

    /// Overrides `engine.similarity_limit` when set
    #[serde(default)]
    pub similarity_limit: Option<usize>,

    /// Overrides `engine.reprocess_threads` when set
    #[serde(default)]
    pub reprocess_threads: Option<usize>,
}

/// One weighted matrix within a recommender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixDef {
    pub label: String,
    pub weight: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            url: default_store_url(),
            timeout_ms: 0,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            similarity_limit: DEFAULT_SIMILARITY_LIMIT,
            reprocess_threads: 0,
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. covisit.toml (base configuration)
    /// 2. covisit.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (COVISIT_* prefix)
    pub fn load() -> Result<Self> {
        let config = Figment::new()
            .merge(Toml::file("covisit.toml"))
            .merge(Toml::file("covisit.local.toml"))
            .merge(Env::prefixed("COVISIT_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self> {
        let config = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("COVISIT_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Resolve a declared recommender into a ready-to-use
    /// [`RecommenderConfig`], applying engine-wide defaults
    pub fn recommender(&self, name: &str) -> Result<RecommenderConfig> {
        let def = self
            .recommenders
            .get(name)
            .ok_or_else(|| Error::UnknownRecommender(name.to_string()))?;
        let mut config = RecommenderConfig::new(name);
        config.matrices = def.matrices.clone();
        config.similarity_limit = def
            .similarity_limit
            .unwrap_or(self.engine.similarity_limit);
        config.reprocess_threads = def
            .reprocess_threads
            .unwrap_or(self.engine.reprocess_threads);
        Ok(config)
    }
}

/// Full definition of one recommender: class name (the keyspace prefix),
/// weighted matrices, row cap, and reprocess parallelism.
///
/// Built either from [`Config::recommender`] or directly in code:
///
/// ```
/// use covisit::RecommenderConfig;
///
/// let config = RecommenderConfig::new("courses")
///     .matrix("users", 3.0)
///     .matrix("tags", 2.0)
///     .similarity_limit(64);
/// assert_eq!(config.matrices.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    pub name: String,
    pub matrices: Vec<MatrixDef>,

    /// Per-item similarity row cap (0 = unbounded)
    pub similarity_limit: usize,

    /// Worker threads for bulk reprocessing (0 = all CPUs)
    pub reprocess_threads: usize,
}

impl RecommenderConfig {
    pub fn new(name: &str) -> Self {
        RecommenderConfig {
            name: name.to_string(),
            matrices: Vec::new(),
            similarity_limit: DEFAULT_SIMILARITY_LIMIT,
            reprocess_threads: 0,
        }
    }

    /// Append a weighted matrix definition
    pub fn matrix(mut self, label: &str, weight: f64) -> Self {
        self.matrices.push(MatrixDef {
            label: label.to_string(),
            weight,
        });
        self
    }

    /// Cap similarity rows at `limit` entries (0 = unbounded)
    pub fn similarity_limit(mut self, limit: usize) -> Self {
        self.similarity_limit = limit;
        self
    }

    /// Use `threads` workers for bulk reprocessing (0 = all CPUs)
    pub fn reprocess_threads(mut self, threads: usize) -> Self {
        self.reprocess_threads = threads;
        self
    }
}
