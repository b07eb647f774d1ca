//! Weighted bipartite relation between sets and items.
//!
//! A matrix stores, per named relation (say "users" or "tags"), which items
//! each set contains, plus the reverse index of which sets contain each
//! item. Both directions live in the store:
//!
//! ```text
//! F_M(s)   = {prefix}:{label}:sets:{set_id}    (forward set)
//! Rev_M(i) = {prefix}:{label}:items:{item_id}  (reverse set)
//! ```
//!
//! Every mutation maintains the invariant `i ∈ F_M(s) ⇔ s ∈ Rev_M(i)`.
//! The two writes per (set, item) pair are not atomic as a unit; a caller
//! dying between them is repaired by a full reprocess or `clean`.

use crate::error::{check_item, check_set, Result};
use crate::keys::Keyspace;
use crate::store::Store;
use std::sync::Arc;

/// One weighted relation inside a recommender
pub struct Matrix<S> {
    label: String,
    weight: f64,
    keys: Keyspace,
    store: Arc<S>,
}

impl<S: Store> Matrix<S> {
    pub(crate) fn new(label: &str, weight: f64, keys: Keyspace, store: Arc<S>) -> Self {
        Self {
            label: label.to_string(),
            weight,
            keys,
            store,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub(crate) fn forward_key(&self, set_id: &str) -> String {
        self.keys.forward(&self.label, set_id)
    }

    pub(crate) fn reverse_key(&self, item: &str) -> String {
        self.keys.reverse(&self.label, item)
    }

    /// Insert items into a set, updating the reverse index and the
    /// recommender-wide item bookkeeping. Idempotent per (set, item).
    pub fn add(&self, set_id: &str, items: &[&str]) -> Result<()> {
        check_set(set_id)?;
        let members = validated(items)?;
        self.store.sadd(&self.forward_key(set_id), &members)?;
        let set = [set_id.to_string()];
        for item in &members {
            self.store.sadd(&self.reverse_key(item), &set)?;
        }
        self.store.sadd(&self.keys.all_items(), &members)?;
        Ok(())
    }

    /// Remove items from a set, updating the reverse index. Idempotent.
    ///
    /// Items stay in the bookkeeping set: they may still appear elsewhere,
    /// and a later reprocess settles rows either way.
    pub fn remove(&self, set_id: &str, items: &[&str]) -> Result<()> {
        check_set(set_id)?;
        let members = validated(items)?;
        self.store.srem(&self.forward_key(set_id), &members)?;
        let set = [set_id.to_string()];
        for item in &members {
            self.store.srem(&self.reverse_key(item), &set)?;
        }
        Ok(())
    }

    /// Items in F_M(set_id)
    pub fn members_of_set(&self, set_id: &str) -> Result<Vec<String>> {
        check_set(set_id)?;
        Ok(self.store.smembers(&self.forward_key(set_id))?)
    }

    /// Set ids whose forward sets contain `item`
    pub fn sets_containing(&self, item: &str) -> Result<Vec<String>> {
        check_item(item)?;
        Ok(self.store.smembers(&self.reverse_key(item))?)
    }

    /// |Rev_M(item)|
    pub fn set_count(&self, item: &str) -> Result<usize> {
        check_item(item)?;
        Ok(self.store.scard(&self.reverse_key(item))?)
    }

    /// Membership test on one forward set
    pub fn contains(&self, set_id: &str, item: &str) -> Result<bool> {
        check_set(set_id)?;
        check_item(item)?;
        Ok(self.store.sismember(&self.forward_key(set_id), item)?)
    }

    /// Remove `item` from every set it appears in, then clear its reverse
    /// set
    pub fn delete_item(&self, item: &str) -> Result<()> {
        check_item(item)?;
        let member = [item.to_string()];
        for set_id in self.store.smembers(&self.reverse_key(item))? {
            self.store.srem(&self.forward_key(&set_id), &member)?;
        }
        self.store.del(&[self.reverse_key(item)])?;
        Ok(())
    }

    /// Remove `set_id` from every reverse set it appears in, then delete
    /// its forward set
    pub fn delete_set(&self, set_id: &str) -> Result<()> {
        check_set(set_id)?;
        let set = [set_id.to_string()];
        for item in self.store.smembers(&self.forward_key(set_id))? {
            self.store.srem(&self.reverse_key(&item), &set)?;
        }
        self.store.del(&[self.forward_key(set_id)])?;
        Ok(())
    }
}

fn validated(items: &[&str]) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| {
            check_item(item)?;
            Ok((*item).to_string())
        })
        .collect()
}
