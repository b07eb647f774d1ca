//! Backing-store abstraction.
//!
//! Every piece of mutable state lives in the store; the rest of the crate
//! only talks to it through the [`Store`] trait. Two implementations ship:
//!
//! - [`RedisStore`]: the production adapter over a remote server, speaking
//!   the native set/sorted-set commands and using a server-side script for
//!   the atomic similarity-row rebuild.
//! - [`MemoryStore`]: a process-local implementation with the same
//!   semantics, used by the test suite and for embedded deployments.
//!
//! Members are opaque strings; sorted-set scores are finite `f64`s and ties
//! order by member id lexicographically, ascending.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use std::collections::HashSet;
use thiserror::Error;

/// Store errors, propagated to callers unchanged (no retries)
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection failure, timeout, broken pipe
    #[error("store transport error: {0}")]
    Transport(String),

    /// Unexpected reply shape, wrong key type, parse failure
    #[error("store protocol error: {0}")]
    Protocol(String),

    /// Server-side script rejected or aborted
    #[error("store script error: {0}")]
    Script(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The narrow interface the engine requires from a backing store.
///
/// Missing keys read as empty collections. Write operations report how many
/// members were actually added/removed so callers can observe idempotence.
pub trait Store: Send + Sync {
    /// Add members to an unordered set. Returns the number newly added.
    fn sadd(&self, key: &str, members: &[String]) -> StoreResult<usize>;

    /// Remove members from an unordered set. Returns the number removed.
    fn srem(&self, key: &str, members: &[String]) -> StoreResult<usize>;

    /// All members of an unordered set (unspecified order)
    fn smembers(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Members of many sets in one round-trip, aligned with `keys`
    fn smembers_many(&self, keys: &[String]) -> StoreResult<Vec<Vec<String>>>;

    /// Cardinality of an unordered set
    fn scard(&self, key: &str) -> StoreResult<usize>;

    /// Membership test on an unordered set
    fn sismember(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Union of many unordered sets
    fn sunion(&self, keys: &[String]) -> StoreResult<HashSet<String>>;

    /// Score of `member` in a sorted set, if present
    fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;

    /// Remove members from a sorted set. Returns the number removed.
    fn zrem(&self, key: &str, members: &[String]) -> StoreResult<usize>;

    /// Cardinality of a sorted set
    fn zcard(&self, key: &str) -> StoreResult<usize>;

    /// Rank-range read with scores. `start`/`stop` are inclusive ranks;
    /// negative ranks count from the tail. Ascending score order (ties by
    /// member id ascending), exactly reversed when `reverse` is set.
    fn zrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        reverse: bool,
    ) -> StoreResult<Vec<(String, f64)>>;

    /// Store-side union of sorted sets into `dest`, summing scores (weight 1
    /// per source). Missing sources contribute nothing. Returns the result
    /// cardinality.
    fn zunion_store(&self, dest: &str, keys: &[String]) -> StoreResult<usize>;

    /// Atomically overwrite a sorted set: delete `key`, insert `entries`,
    /// and when `keep_top > 0` trim to the `keep_top` highest-scoring
    /// members (lowest `(score, member)` pairs evicted first). Concurrent
    /// readers observe either the old row or the fully rebuilt one.
    /// Returns the resulting cardinality.
    fn replace_row(&self, key: &str, entries: &[(String, f64)], keep_top: usize)
        -> StoreResult<usize>;

    /// Delete keys outright. Returns the number that existed.
    fn del(&self, keys: &[String]) -> StoreResult<usize>;

    /// Every key matching a `*`-wildcard pattern
    fn keys_matching(&self, pattern: &str) -> StoreResult<Vec<String>>;
}
