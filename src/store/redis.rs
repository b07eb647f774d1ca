//! Remote store adapter.
//!
//! Thin wrapper over the `redis` crate's synchronous API. One connection is
//! shared behind a mutex; batch reads go through a single pipeline and the
//! atomic row rebuild runs as one server-side Lua script, so concurrent
//! readers of a similarity row observe either the old row or the fully
//! rebuilt one.

use super::{Store, StoreError, StoreResult};
use crate::config::Config;
use parking_lot::Mutex;
use redis::{Commands, ErrorKind, Script};
use std::collections::HashSet;
use std::time::Duration;
use tracing::trace;

/// Atomic similarity-row rebuild: delete, insert all entries, trim to the
/// top-K by (score, member). ARGV[1] is the cap (0 = unbounded), followed by
/// alternating score/member pairs.
const REPLACE_ROW_SCRIPT: &str = r"
redis.call('DEL', KEYS[1])
local limit = tonumber(ARGV[1])
for i = 2, #ARGV, 2 do
  redis.call('ZADD', KEYS[1], ARGV[i], ARGV[i + 1])
end
if limit > 0 then
  redis.call('ZREMRANGEBYRANK', KEYS[1], 0, -(limit + 1))
end
return redis.call('ZCARD', KEYS[1])
";

/// Remote [`Store`] implementation
pub struct RedisStore {
    conn: Mutex<redis::Connection>,
    replace_row: Script,
}

impl RedisStore {
    /// Connect to a store at `url` (e.g. `redis://127.0.0.1:6379/0`)
    pub fn connect(url: &str) -> StoreResult<Self> {
        Self::connect_with_timeout(url, None)
    }

    /// Connect with a per-request read/write timeout
    pub fn connect_with_timeout(url: &str, timeout: Option<Duration>) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection()?;
        if let Some(t) = timeout {
            conn.set_read_timeout(Some(t))?;
            conn.set_write_timeout(Some(t))?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
            replace_row: Script::new(REPLACE_ROW_SCRIPT),
        })
    }

    /// Connect using the `[store]` section of a loaded [`Config`]
    pub fn from_config(config: &Config) -> StoreResult<Self> {
        let timeout = (config.store.timeout_ms > 0)
            .then(|| Duration::from_millis(config.store.timeout_ms));
        Self::connect_with_timeout(&config.store.url, timeout)
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        let detail = err.to_string();
        if err.is_io_error() || err.is_timeout() || err.is_connection_dropped() {
            return StoreError::Transport(detail);
        }
        match err.kind() {
            ErrorKind::NoScriptError | ErrorKind::BusyLoadingError => StoreError::Script(detail),
            ErrorKind::ResponseError if detail.contains("script") => StoreError::Script(detail),
            _ => StoreError::Protocol(detail),
        }
    }
}

impl Store for RedisStore {
    fn sadd(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        Ok(conn.sadd(key, members)?)
    }

    fn srem(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        Ok(conn.srem(key, members)?)
    }

    fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.lock();
        Ok(conn.smembers(key)?)
    }

    fn smembers_many(&self, keys: &[String]) -> StoreResult<Vec<Vec<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        trace!(batch = keys.len(), "pipelined smembers");
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.smembers(key);
        }
        let mut conn = self.conn.lock();
        Ok(pipe.query(&mut *conn)?)
    }

    fn scard(&self, key: &str) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        Ok(conn.scard(key)?)
    }

    fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn.lock();
        Ok(conn.sismember(key, member)?)
    }

    fn sunion(&self, keys: &[String]) -> StoreResult<HashSet<String>> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }
        let mut conn = self.conn.lock();
        Ok(conn.sunion(keys)?)
    }

    fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let mut conn = self.conn.lock();
        Ok(conn.zscore(key, member)?)
    }

    fn zrem(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        Ok(conn.zrem(key, members)?)
    }

    fn zcard(&self, key: &str) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        Ok(conn.zcard(key)?)
    }

    fn zrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        reverse: bool,
    ) -> StoreResult<Vec<(String, f64)>> {
        let mut conn = self.conn.lock();
        let rows = if reverse {
            conn.zrevrange_withscores(key, start, stop)?
        } else {
            conn.zrange_withscores(key, start, stop)?
        };
        Ok(rows)
    }

    fn zunion_store(&self, dest: &str, keys: &[String]) -> StoreResult<usize> {
        if keys.is_empty() {
            self.del(&[dest.to_string()])?;
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        Ok(conn.zunionstore(dest, keys)?)
    }

    fn replace_row(
        &self,
        key: &str,
        entries: &[(String, f64)],
        keep_top: usize,
    ) -> StoreResult<usize> {
        let mut invocation = self.replace_row.prepare_invoke();
        invocation.key(key).arg(keep_top);
        for (member, score) in entries {
            invocation.arg(*score).arg(member);
        }
        let mut conn = self.conn.lock();
        let kept: usize = invocation.invoke(&mut *conn)?;
        Ok(kept)
    }

    fn del(&self, keys: &[String]) -> StoreResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        Ok(conn.del(keys)?)
    }

    fn keys_matching(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.lock();
        let keys: Vec<String> = conn.scan_match(pattern)?.collect();
        Ok(keys)
    }
}
