use super::{SetStore, StoreError, StoreResult};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis_utils::{with_timeout, CommandError, SharedConnectionManager};
use std::time::Duration;
use tracing::{error, info};

/// Set store on top of Redis sets (`S*`) and sorted sets (`Z*`).
pub struct RedisSetStore {
    redis_manager: SharedConnectionManager,
    command_timeout: Duration,
}

impl RedisSetStore {
    pub fn new(redis_manager: SharedConnectionManager, command_timeout: Duration) -> Self {
        info!(
            timeout_ms = command_timeout.as_millis() as u64,
            "Initializing Redis set store"
        );
        Self {
            redis_manager,
            command_timeout,
        }
    }
}

fn map_redis_error(command: &'static str, err: CommandError) -> StoreError {
    error!(command = command, error = %err, "Redis command failed");
    match err {
        CommandError::Timeout(_) => StoreError::Timeout,
        CommandError::Redis(err) => StoreError::Redis(err),
    }
}

/// Inclusive `ZREVRANGE` bounds for a page. A stop past `isize::MAX` becomes
/// `-1` (the last element); an empty page or unreachable offset yields `None`.
fn zrange_bounds(offset: usize, count: usize) -> Option<(isize, isize)> {
    if count == 0 {
        return None;
    }
    let start = isize::try_from(offset).ok()?;
    let stop = isize::try_from(offset.saturating_add(count - 1)).unwrap_or(-1);
    Some((start, stop))
}

#[async_trait]
impl SetStore for RedisSetStore {
    async fn members(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.redis_manager.lock().await;
        let members: Vec<String> = with_timeout(self.command_timeout, conn.smembers(key))
            .await
            .map_err(|e| map_redis_error("SMEMBERS", e))?;
        Ok(members)
    }

    async fn union(&self, keys: Vec<String>) -> StoreResult<Vec<String>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.redis_manager.lock().await;
        let members: Vec<String> = with_timeout(self.command_timeout, conn.sunion(keys))
            .await
            .map_err(|e| map_redis_error("SUNION", e))?;
        Ok(members)
    }

    async fn intersection_count(&self, left: &str, right: &str) -> StoreResult<usize> {
        let mut conn = self.redis_manager.lock().await;
        let shared: Vec<String> = with_timeout(self.command_timeout, conn.sinter(vec![left, right]))
            .await
            .map_err(|e| map_redis_error("SINTER", e))?;
        Ok(shared.len())
    }

    async fn cardinality(&self, key: &str) -> StoreResult<usize> {
        let mut conn = self.redis_manager.lock().await;
        let count: usize = with_timeout(self.command_timeout, conn.scard(key))
            .await
            .map_err(|e| map_redis_error("SCARD", e))?;
        Ok(count)
    }

    async fn difference(&self, left: &str, right: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.redis_manager.lock().await;
        let members: Vec<String> = with_timeout(self.command_timeout, conn.sdiff(vec![left, right]))
            .await
            .map_err(|e| map_redis_error("SDIFF", e))?;
        Ok(members)
    }

    async fn add_member(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.redis_manager.lock().await;
        let _: () = with_timeout(self.command_timeout, conn.sadd(key, value))
            .await
            .map_err(|e| map_redis_error("SADD", e))?;
        Ok(())
    }

    async fn is_member(&self, key: &str, value: &str) -> StoreResult<bool> {
        let mut conn = self.redis_manager.lock().await;
        let present: bool = with_timeout(self.command_timeout, conn.sismember(key, value))
            .await
            .map_err(|e| map_redis_error("SISMEMBER", e))?;
        Ok(present)
    }

    async fn ranked_insert(&self, key: &str, score: f64, member: &str) -> StoreResult<()> {
        let mut conn = self.redis_manager.lock().await;
        let _: () = with_timeout(self.command_timeout, conn.zadd(key, member, score))
            .await
            .map_err(|e| map_redis_error("ZADD", e))?;
        Ok(())
    }

    async fn ranked_increment(&self, key: &str, delta: f64, member: &str) -> StoreResult<f64> {
        let mut conn = self.redis_manager.lock().await;
        let score: f64 = with_timeout(self.command_timeout, conn.zincr(key, member, delta))
            .await
            .map_err(|e| map_redis_error("ZINCRBY", e))?;
        Ok(score)
    }

    async fn ranked_score(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let mut conn = self.redis_manager.lock().await;
        let score: Option<f64> = with_timeout(self.command_timeout, conn.zscore(key, member))
            .await
            .map_err(|e| map_redis_error("ZSCORE", e))?;
        Ok(score)
    }

    async fn ranked_remove(&self, key: &str, members: Vec<String>) -> StoreResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.redis_manager.lock().await;
        let _: () = with_timeout(self.command_timeout, conn.zrem(key, members))
            .await
            .map_err(|e| map_redis_error("ZREM", e))?;
        Ok(())
    }

    async fn ranked_range_descending(
        &self,
        key: &str,
        offset: usize,
        count: usize,
    ) -> StoreResult<Vec<(String, f64)>> {
        let Some((start, stop)) = zrange_bounds(offset, count) else {
            return Ok(Vec::new());
        };

        let mut conn = self.redis_manager.lock().await;
        let entries: Vec<(String, f64)> = with_timeout(
            self.command_timeout,
            conn.zrevrange_withscores(key, start, stop),
        )
        .await
        .map_err(|e| map_redis_error("ZREVRANGE", e))?;
        Ok(entries)
    }

    async fn union_store_into(&self, dest: &str, sources: Vec<String>) -> StoreResult<()> {
        let mut conn = self.redis_manager.lock().await;
        if sources.is_empty() {
            let _: () = with_timeout(self.command_timeout, conn.del(dest))
                .await
                .map_err(|e| map_redis_error("DEL", e))?;
            return Ok(());
        }
        let _: () = with_timeout(self.command_timeout, conn.sunionstore(dest, sources))
            .await
            .map_err(|e| map_redis_error("SUNIONSTORE", e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.redis_manager.lock().await;
        let _: () = with_timeout(self.command_timeout, conn.del(key))
            .await
            .map_err(|e| map_redis_error("DEL", e))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.redis_manager.lock().await;
        let present: bool = with_timeout(self.command_timeout, conn.exists(key))
            .await
            .map_err(|e| map_redis_error("EXISTS", e))?;
        Ok(present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zrange_bounds() {
        assert_eq!(zrange_bounds(0, 10), Some((0, 9)));
        assert_eq!(zrange_bounds(5, 1), Some((5, 5)));
        assert_eq!(zrange_bounds(0, 0), None);
    }

    #[test]
    fn test_zrange_bounds_saturate_to_last_element() {
        assert_eq!(zrange_bounds(0, usize::MAX), Some((0, -1)));
        assert_eq!(zrange_bounds(3, usize::MAX - 1), Some((3, -1)));
        assert_eq!(zrange_bounds(usize::MAX, 1), None);
    }
}
