use super::{SetStore, StoreResult};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    sets: HashMap<String, BTreeSet<String>>,
    ranked: HashMap<String, HashMap<String, f64>>,
}

impl MemoryState {
    fn set(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.sets.get(key)
    }

    fn set_or_empty(&self, key: &str) -> BTreeSet<String> {
        self.set(key).cloned().unwrap_or_default()
    }

    /// Stores `members` under `key`; an empty set removes the key, as in Redis.
    fn replace_set(&mut self, key: &str, members: BTreeSet<String>) {
        if members.is_empty() {
            self.sets.remove(key);
        } else {
            self.sets.insert(key.to_string(), members);
        }
    }
}

/// In-process set store with Redis-compatible semantics.
///
/// Used for single-node deployments (`STORE_BACKEND=memory`) and tests.
/// Nothing is persisted.
#[derive(Default)]
pub struct MemorySetStore {
    state: Mutex<MemoryState>,
}

impl MemorySetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys (sets and sorted sets).
    pub async fn key_count(&self) -> usize {
        let state = self.state.lock().await;
        state.sets.len() + state.ranked.len()
    }
}

#[async_trait]
impl SetStore for MemorySetStore {
    async fn members(&self, key: &str) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .set(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn union(&self, keys: Vec<String>) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        let mut merged = BTreeSet::new();
        for key in &keys {
            if let Some(members) = state.set(key) {
                merged.extend(members.iter().cloned());
            }
        }
        Ok(merged.into_iter().collect())
    }

    async fn intersection_count(&self, left: &str, right: &str) -> StoreResult<usize> {
        let state = self.state.lock().await;
        let count = match (state.set(left), state.set(right)) {
            (Some(a), Some(b)) => a.intersection(b).count(),
            _ => 0,
        };
        Ok(count)
    }

    async fn cardinality(&self, key: &str) -> StoreResult<usize> {
        let state = self.state.lock().await;
        Ok(state.set(key).map(BTreeSet::len).unwrap_or(0))
    }

    async fn difference(&self, left: &str, right: &str) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        let Some(base) = state.set(left) else {
            return Ok(Vec::new());
        };
        let result = match state.set(right) {
            Some(excluded) => base.difference(excluded).cloned().collect(),
            None => base.iter().cloned().collect(),
        };
        Ok(result)
    }

    async fn add_member(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(value.to_string());
        Ok(())
    }

    async fn is_member(&self, key: &str, value: &str) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .set(key)
            .map(|members| members.contains(value))
            .unwrap_or(false))
    }

    async fn ranked_insert(&self, key: &str, score: f64, member: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state
            .ranked
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn ranked_increment(&self, key: &str, delta: f64, member: &str) -> StoreResult<f64> {
        let mut state = self.state.lock().await;
        let score = state
            .ranked
            .entry(key.to_string())
            .or_default()
            .entry(member.to_string())
            .or_insert(0.0);
        *score += delta;
        Ok(*score)
    }

    async fn ranked_score(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let state = self.state.lock().await;
        Ok(state
            .ranked
            .get(key)
            .and_then(|entries| entries.get(member).copied()))
    }

    async fn ranked_remove(&self, key: &str, members: Vec<String>) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let now_empty = match state.ranked.get_mut(key) {
            Some(entries) => {
                for member in &members {
                    entries.remove(member);
                }
                entries.is_empty()
            }
            None => false,
        };
        if now_empty {
            state.ranked.remove(key);
        }
        Ok(())
    }

    async fn ranked_range_descending(
        &self,
        key: &str,
        offset: usize,
        count: usize,
    ) -> StoreResult<Vec<(String, f64)>> {
        let state = self.state.lock().await;
        let Some(entries) = state.ranked.get(key) else {
            return Ok(Vec::new());
        };

        let mut ordered: Vec<(String, f64)> = entries
            .iter()
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        ordered.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.0.cmp(&a.0))
        });

        Ok(ordered.into_iter().skip(offset).take(count).collect())
    }

    async fn union_store_into(&self, dest: &str, sources: Vec<String>) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let mut merged = BTreeSet::new();
        for key in &sources {
            merged.extend(state.set_or_empty(key));
        }
        state.replace_set(dest, merged);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.sets.remove(key);
        state.ranked.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state.sets.contains_key(key) || state.ranked.contains_key(key))
    }
}
