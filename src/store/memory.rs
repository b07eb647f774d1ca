//! In-process store with the same observable semantics as the remote one.
//!
//! Backs the test suite and embedded single-process deployments. One mutex
//! guards the whole keyspace, which makes every operation (including
//! `replace_row` and `zunion_store`) trivially atomic.

use super::{Store, StoreError, StoreResult};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// One keyspace entry; keys are typed by first write, like the remote store
#[derive(Debug, Clone)]
enum Entry {
    Set(HashSet<String>),
    Sorted(HashMap<String, f64>),
}

/// Process-local [`Store`] implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys (test helper)
    pub fn key_count(&self) -> usize {
        self.data.lock().len()
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Protocol(format!(
        "WRONGTYPE operation against key '{key}' holding the wrong kind of value"
    ))
}

fn as_set<'a>(key: &str, entry: &'a mut Entry) -> StoreResult<&'a mut HashSet<String>> {
    match entry {
        Entry::Set(s) => Ok(s),
        Entry::Sorted(_) => Err(wrong_type(key)),
    }
}

fn as_sorted<'a>(key: &str, entry: &'a mut Entry) -> StoreResult<&'a mut HashMap<String, f64>> {
    match entry {
        Entry::Sorted(z) => Ok(z),
        Entry::Set(_) => Err(wrong_type(key)),
    }
}

/// Ascending store order: by score, ties by member id
fn sorted_pairs(zset: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut pairs: Vec<(String, f64)> = zset.iter().map(|(m, s)| (m.clone(), *s)).collect();
    pairs.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    pairs
}

/// Resolve an inclusive rank range with tail-relative negative indices
fn resolve_range(start: isize, stop: isize, len: usize) -> Option<(usize, usize)> {
    let len = len as isize;
    let mut lo = if start < 0 { start + len } else { start };
    let mut hi = if stop < 0 { stop + len } else { stop };
    lo = lo.max(0);
    hi = hi.min(len - 1);
    if lo > hi || lo >= len {
        return None;
    }
    Some((lo as usize, hi as usize))
}

/// Minimal `*`-only glob match
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }
    let mut rest = key;
    for (idx, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if idx == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if idx == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    // Pattern ends with '*': any remainder matches
    true
}

impl Store for MemoryStore {
    fn sadd(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut data = self.data.lock();
        let entry = data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(HashSet::new()));
        let set = as_set(key, entry)?;
        Ok(members.iter().filter(|m| set.insert((*m).clone())).count())
    }

    fn srem(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut data = self.data.lock();
        let Some(entry) = data.get_mut(key) else {
            return Ok(0);
        };
        let set = as_set(key, entry)?;
        let removed = members.iter().filter(|m| set.remove(m.as_str())).count();
        if set.is_empty() {
            data.remove(key);
        }
        Ok(removed)
    }

    fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut data = self.data.lock();
        match data.get_mut(key) {
            Some(entry) => Ok(as_set(key, entry)?.iter().cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    fn smembers_many(&self, keys: &[String]) -> StoreResult<Vec<Vec<String>>> {
        let mut data = self.data.lock();
        keys.iter()
            .map(|key| match data.get_mut(key.as_str()) {
                Some(entry) => Ok(as_set(key, entry)?.iter().cloned().collect()),
                None => Ok(Vec::new()),
            })
            .collect()
    }

    fn scard(&self, key: &str) -> StoreResult<usize> {
        let mut data = self.data.lock();
        match data.get_mut(key) {
            Some(entry) => Ok(as_set(key, entry)?.len()),
            None => Ok(0),
        }
    }

    fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut data = self.data.lock();
        match data.get_mut(key) {
            Some(entry) => Ok(as_set(key, entry)?.contains(member)),
            None => Ok(false),
        }
    }

    fn sunion(&self, keys: &[String]) -> StoreResult<HashSet<String>> {
        let mut data = self.data.lock();
        let mut union = HashSet::new();
        for key in keys {
            if let Some(entry) = data.get_mut(key.as_str()) {
                union.extend(as_set(key, entry)?.iter().cloned());
            }
        }
        Ok(union)
    }

    fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let mut data = self.data.lock();
        match data.get_mut(key) {
            Some(entry) => Ok(as_sorted(key, entry)?.get(member).copied()),
            None => Ok(None),
        }
    }

    fn zrem(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut data = self.data.lock();
        let Some(entry) = data.get_mut(key) else {
            return Ok(0);
        };
        let zset = as_sorted(key, entry)?;
        let removed = members
            .iter()
            .filter(|m| zset.remove(m.as_str()).is_some())
            .count();
        if zset.is_empty() {
            data.remove(key);
        }
        Ok(removed)
    }

    fn zcard(&self, key: &str) -> StoreResult<usize> {
        let mut data = self.data.lock();
        match data.get_mut(key) {
            Some(entry) => Ok(as_sorted(key, entry)?.len()),
            None => Ok(0),
        }
    }

    fn zrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        reverse: bool,
    ) -> StoreResult<Vec<(String, f64)>> {
        let mut data = self.data.lock();
        let Some(entry) = data.get_mut(key) else {
            return Ok(Vec::new());
        };
        let mut pairs = sorted_pairs(as_sorted(key, entry)?);
        if reverse {
            pairs.reverse();
        }
        match resolve_range(start, stop, pairs.len()) {
            Some((lo, hi)) => Ok(pairs[lo..=hi].to_vec()),
            None => Ok(Vec::new()),
        }
    }

    fn zunion_store(&self, dest: &str, keys: &[String]) -> StoreResult<usize> {
        let mut data = self.data.lock();
        let mut sums: HashMap<String, f64> = HashMap::new();
        for key in keys {
            if let Some(entry) = data.get_mut(key.as_str()) {
                for (member, score) in as_sorted(key, entry)? {
                    *sums.entry(member.clone()).or_insert(0.0) += *score;
                }
            }
        }
        let len = sums.len();
        if sums.is_empty() {
            data.remove(dest);
        } else {
            data.insert(dest.to_string(), Entry::Sorted(sums));
        }
        Ok(len)
    }

    fn replace_row(
        &self,
        key: &str,
        entries: &[(String, f64)],
        keep_top: usize,
    ) -> StoreResult<usize> {
        let mut data = self.data.lock();
        data.remove(key);
        let mut zset: HashMap<String, f64> =
            entries.iter().map(|(m, s)| (m.clone(), *s)).collect();
        if keep_top > 0 && zset.len() > keep_top {
            let evict = zset.len() - keep_top;
            for (member, _) in sorted_pairs(&zset).into_iter().take(evict) {
                zset.remove(&member);
            }
        }
        let len = zset.len();
        if !zset.is_empty() {
            data.insert(key.to_string(), Entry::Sorted(zset));
        }
        Ok(len)
    }

    fn del(&self, keys: &[String]) -> StoreResult<usize> {
        let mut data = self.data.lock();
        Ok(keys.iter().filter(|k| data.remove(k.as_str()).is_some()).count())
    }

    fn keys_matching(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let data = self.data.lock();
        Ok(data
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_sadd_is_idempotent() {
        let store = MemoryStore::new();
        assert_eq!(store.sadd("k", &strs(&["a", "b"])).unwrap(), 2);
        assert_eq!(store.sadd("k", &strs(&["a", "b"])).unwrap(), 0);
        assert_eq!(store.scard("k").unwrap(), 2);
    }

    #[test]
    fn test_srem_drops_empty_key() {
        let store = MemoryStore::new();
        store.sadd("k", &strs(&["a"])).unwrap();
        assert_eq!(store.srem("k", &strs(&["a"])).unwrap(), 1);
        assert_eq!(store.key_count(), 0);
        assert_eq!(store.srem("k", &strs(&["a"])).unwrap(), 0);
    }

    #[test]
    fn test_missing_keys_read_as_empty() {
        let store = MemoryStore::new();
        assert!(store.smembers("nope").unwrap().is_empty());
        assert_eq!(store.scard("nope").unwrap(), 0);
        assert!(!store.sismember("nope", "a").unwrap());
        assert_eq!(store.zcard("nope").unwrap(), 0);
        assert!(store.zscore("nope", "a").unwrap().is_none());
        assert!(store
            .zrange_with_scores("nope", 0, -1, false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_wrong_type_access_is_a_protocol_error() {
        let store = MemoryStore::new();
        store.sadd("k", &strs(&["a"])).unwrap();
        let err = store.zcard("k").unwrap_err();
        assert!(matches!(err, StoreError::Protocol(_)));
    }

    #[test]
    fn test_zrange_orders_by_score_then_member() {
        let store = MemoryStore::new();
        store
            .replace_row(
                "z",
                &[
                    ("b".to_string(), 2.0),
                    ("c".to_string(), 1.0),
                    ("a".to_string(), 2.0),
                ],
                0,
            )
            .unwrap();
        let asc = store.zrange_with_scores("z", 0, -1, false).unwrap();
        let members: Vec<&str> = asc.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(members, vec!["c", "a", "b"]);

        let desc = store.zrange_with_scores("z", 0, -1, true).unwrap();
        let members: Vec<&str> = desc.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(members, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_zrange_negative_ranks() {
        let store = MemoryStore::new();
        store
            .replace_row(
                "z",
                &[
                    ("a".to_string(), 1.0),
                    ("b".to_string(), 2.0),
                    ("c".to_string(), 3.0),
                ],
                0,
            )
            .unwrap();
        let tail = store.zrange_with_scores("z", -2, -1, false).unwrap();
        let members: Vec<&str> = tail.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(members, vec!["b", "c"]);
        assert!(store.zrange_with_scores("z", 5, 9, false).unwrap().is_empty());
    }

    #[test]
    fn test_replace_row_trims_lowest_pairs_first() {
        let store = MemoryStore::new();
        store
            .replace_row(
                "z",
                &[
                    ("a".to_string(), 0.5),
                    ("b".to_string(), 0.9),
                    ("c".to_string(), 0.5),
                    ("d".to_string(), 0.7),
                ],
                2,
            )
            .unwrap();
        let kept = store.zrange_with_scores("z", 0, -1, true).unwrap();
        let members: Vec<&str> = kept.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(members, vec!["b", "d"]);
    }

    #[test]
    fn test_replace_row_with_no_entries_clears_key() {
        let store = MemoryStore::new();
        store
            .replace_row("z", &[("a".to_string(), 1.0)], 0)
            .unwrap();
        assert_eq!(store.replace_row("z", &[], 0).unwrap(), 0);
        assert_eq!(store.key_count(), 0);
    }

    #[test]
    fn test_zunion_store_sums_scores() {
        let store = MemoryStore::new();
        store
            .replace_row("x", &[("a".to_string(), 1.0), ("b".to_string(), 2.0)], 0)
            .unwrap();
        store
            .replace_row("y", &[("b".to_string(), 0.5), ("c".to_string(), 4.0)], 0)
            .unwrap();
        let n = store
            .zunion_store("dest", &strs(&["x", "y", "missing"]))
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(store.zscore("dest", "b").unwrap(), Some(2.5));
        assert_eq!(store.zscore("dest", "c").unwrap(), Some(4.0));
    }

    #[test]
    fn test_keys_matching() {
        let store = MemoryStore::new();
        store.sadd("app:users:sets:u1", &strs(&["a"])).unwrap();
        store.sadd("app:tags:sets:t1", &strs(&["a"])).unwrap();
        store.sadd("other:users:sets:u1", &strs(&["a"])).unwrap();
        let mut keys = store.keys_matching("app:*").unwrap();
        keys.sort();
        assert_eq!(keys, strs(&["app:tags:sets:t1", "app:users:sets:u1"]));
        let keys = store.keys_matching("app:*:sets:*").unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(store.keys_matching("app:users:sets:u1").unwrap().len(), 1);
    }

    #[test]
    fn test_sunion() {
        let store = MemoryStore::new();
        store.sadd("a", &strs(&["1", "2"])).unwrap();
        store.sadd("b", &strs(&["2", "3"])).unwrap();
        let union = store.sunion(&strs(&["a", "b", "c"])).unwrap();
        assert_eq!(union.len(), 3);
        assert!(store.sunion(&[]).unwrap().is_empty());
    }
}
