//! Keyspace layout shared by every component of a recommender.
//!
//! All keys live under the recommender's class-name prefix:
//!
//! ```text
//! {prefix}:{label}:sets:{set_id}      forward set  (set id  -> items)
//! {prefix}:{label}:items:{item_id}    reverse set  (item    -> set ids)
//! {prefix}:similarities:{item_id}     similarity row S(item)
//! {prefix}:all_items                  bookkeeping set of every known item
//! {prefix}:scratch:{uuid}             transient union destination
//! ```

use uuid::Uuid;

/// Key builder for one recommender's namespace
#[derive(Debug, Clone)]
pub(crate) struct Keyspace {
    prefix: String,
}

impl Keyspace {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    /// Forward set F_M(s): items contained in `set_id` within matrix `label`
    pub fn forward(&self, label: &str, set_id: &str) -> String {
        format!("{}:{}:sets:{}", self.prefix, label, set_id)
    }

    /// Reverse set Rev_M(i): set ids containing `item` within matrix `label`
    pub fn reverse(&self, label: &str, item: &str) -> String {
        format!("{}:{}:items:{}", self.prefix, label, item)
    }

    /// Similarity row S(item)
    pub fn similarity(&self, item: &str) -> String {
        format!("{}:similarities:{}", self.prefix, item)
    }

    /// Bookkeeping set of every item known to the recommender
    pub fn all_items(&self) -> String {
        format!("{}:all_items", self.prefix)
    }

    /// Fresh transient key for store-side aggregation; unique per call so
    /// concurrent queries never collide
    pub fn scratch(&self) -> String {
        format!("{}:scratch:{}", self.prefix, Uuid::new_v4())
    }

    /// Match pattern covering every key of the recommender
    pub fn wildcard(&self) -> String {
        format!("{}:*", self.prefix)
    }

    /// Match pattern covering every forward set of one matrix
    pub fn forward_wildcard(&self, label: &str) -> String {
        format!("{}:{}:sets:*", self.prefix, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let keys = Keyspace::new("courses");
        assert_eq!(keys.forward("users", "u1"), "courses:users:sets:u1");
        assert_eq!(keys.reverse("users", "c1"), "courses:users:items:c1");
        assert_eq!(keys.similarity("c1"), "courses:similarities:c1");
        assert_eq!(keys.all_items(), "courses:all_items");
        assert_eq!(keys.wildcard(), "courses:*");
        assert_eq!(keys.forward_wildcard("tags"), "courses:tags:sets:*");
    }

    #[test]
    fn test_scratch_keys_are_unique() {
        let keys = Keyspace::new("courses");
        let a = keys.scratch();
        let b = keys.scratch();
        assert!(a.starts_with("courses:scratch:"));
        assert_ne!(a, b);
    }
}
