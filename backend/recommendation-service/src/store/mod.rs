//! Set store capability consumed by the recommendation engine.
//!
//! The engine only needs plain sets and score-ordered sets. `RedisSetStore`
//! maps these onto Redis commands; `MemorySetStore` keeps them in-process for
//! local runs and tests.

mod memory;
mod redis_store;

pub use memory::MemorySetStore;
pub use redis_store::RedisSetStore;

use async_trait::async_trait;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store command timed out")]
    Timeout,

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Primitive set and sorted-set operations.
///
/// Missing keys behave like empty sets. Sorted-set members are unique; an
/// insert for an existing member overwrites its score.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SetStore: Send + Sync {
    async fn members(&self, key: &str) -> StoreResult<Vec<String>>;

    async fn union(&self, keys: Vec<String>) -> StoreResult<Vec<String>>;

    async fn intersection_count(&self, left: &str, right: &str) -> StoreResult<usize>;

    async fn cardinality(&self, key: &str) -> StoreResult<usize>;

    /// Members of `left` that are not in `right`.
    async fn difference(&self, left: &str, right: &str) -> StoreResult<Vec<String>>;

    async fn add_member(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn is_member(&self, key: &str, value: &str) -> StoreResult<bool>;

    async fn ranked_insert(&self, key: &str, score: f64, member: &str) -> StoreResult<()>;

    /// Adds `delta` to the member's score (starting from 0) and returns the new score.
    async fn ranked_increment(&self, key: &str, delta: f64, member: &str) -> StoreResult<f64>;

    async fn ranked_score(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;

    async fn ranked_remove(&self, key: &str, members: Vec<String>) -> StoreResult<()>;

    /// Highest scores first; ties ordered by member, descending.
    async fn ranked_range_descending(
        &self,
        key: &str,
        offset: usize,
        count: usize,
    ) -> StoreResult<Vec<(String, f64)>>;

    /// Replaces `dest` with the union of `sources`.
    async fn union_store_into(&self, dest: &str, sources: Vec<String>) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;
}
